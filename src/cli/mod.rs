//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;

pub use args::*;

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::info;

use wordcache::persist::{data_dir, settings_path_for, snapshot_path_for};
use wordcache::watcher::start_watcher;
use wordcache::{
    CacheError, Command, DocumentId, ExclusionConfig, FlushOutcome, FsSource, IndexEntry,
    Persistence, ReconcileStats, Service, WordCountCache,
};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Incrementally maintained word counts for a directory of Markdown notes
#[derive(Parser, Debug)]
#[command(name = "wordcache", version, about, after_help = "\
Run 'wordcache <COMMAND> --help' for detailed options and examples.\n\
Common options: -d <DIR> (vault directory), -e <EXT> (extensions), --cache-file <FILE>")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Reconcile the snapshot with the vault once and exit
    Scan(ScanArgs),

    /// Keep counts up to date as files change, until Ctrl-C
    Watch(WatchArgs),

    /// Print the word count of one document, or of every document
    Get(GetArgs),

    /// Print the total word count across the vault
    Total(TotalArgs),

    /// Show or change exclusion settings
    Config(ConfigArgs),

    /// Show snapshot and settings locations and statistics
    Info(InfoArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan(args) => cmd_scan(args),
        Commands::Watch(args) => cmd_watch(args),
        Commands::Get(args) => cmd_get(args),
        Commands::Total(args) => cmd_total(args),
        Commands::Config(args) => cmd_config(args),
        Commands::Info(args) => cmd_info(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ─── Shared setup ───────────────────────────────────────────────────

fn init_logging(common: &CommonArgs, default_level: &str) {
    let level = common.log_level.as_deref().unwrap_or(default_level);
    let log_level = match level {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(std::io::stderr);
    // A subscriber may already be installed (e.g. in tests); keep it.
    let _ = if common.log_json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Snapshot and settings locations for a vault.
#[derive(Debug, Clone)]
pub(crate) struct VaultPaths {
    pub root: PathBuf,
    pub snapshot: PathBuf,
    pub settings: PathBuf,
}

pub(crate) fn resolve_paths(common: &CommonArgs) -> Result<VaultPaths, CacheError> {
    let root = Path::new(&common.dir);
    if !root.is_dir() {
        return Err(CacheError::DirNotFound(common.dir.clone()));
    }
    let base = data_dir();
    let snapshot = match &common.cache_file {
        Some(f) => PathBuf::from(f),
        None => snapshot_path_for(root, &base),
    };
    let settings = match &common.config {
        Some(f) => PathBuf::from(f),
        None => settings_path_for(root, &base),
    };
    Ok(VaultPaths { root: root.to_path_buf(), snapshot, settings })
}

fn open_source(common: &CommonArgs) -> Result<FsSource, CacheError> {
    let extensions = common.extensions();
    if extensions.is_empty() {
        return Err(CacheError::InvalidArgs("No file extensions given (-e)".to_string()));
    }
    Ok(FsSource::new(&common.dir, extensions)?
        .with_hidden(common.hidden)
        .with_no_ignore(common.no_ignore)
        .with_threads(common.threads))
}

fn open_cache(common: &CommonArgs, paths: &VaultPaths) -> Result<WordCountCache<FsSource>, CacheError> {
    let source = open_source(common)?;
    let config = ExclusionConfig::load(&paths.settings)?;
    let extensions = source.extensions().to_vec();
    Ok(WordCountCache::open(source, config, Persistence::new(&paths.snapshot)).with_extensions(extensions))
}

/// Entries from the snapshot, or an error telling the user to scan first.
fn load_snapshot(paths: &VaultPaths) -> Result<BTreeMap<DocumentId, IndexEntry>, CacheError> {
    Persistence::new(&paths.snapshot).load_entries()?.ok_or_else(|| {
        CacheError::InvalidArgs(format!(
            "No snapshot for {} at {}. Run 'wordcache scan -d {}' first.",
            paths.root.display(),
            paths.snapshot.display(),
            paths.root.display()
        ))
    })
}

/// Accept `./notes/a.md` and `notes\a.md` as `notes/a.md`.
pub(crate) fn normalize_id(raw: &str) -> DocumentId {
    let slashed = raw.trim().replace('\\', "/");
    let trimmed = slashed.trim_start_matches("./").trim_start_matches('/');
    DocumentId::new(trimmed)
}

// ─── scan ───────────────────────────────────────────────────────────

pub(crate) fn scan(args: &ScanArgs) -> Result<(ReconcileStats, u64, PathBuf), CacheError> {
    let paths = resolve_paths(&args.common)?;
    let mut cache = open_cache(&args.common, &paths)?;
    let stats = cache.initial_reconcile(Duration::from_millis(args.startup_retry_ms))?;
    let total = cache.query().total();
    if cache.flush() == FlushOutcome::Failed {
        return Err(CacheError::SnapshotSave {
            path: paths.snapshot.display().to_string(),
            message: "write failed, see log".to_string(),
        });
    }
    Ok((stats, total, paths.snapshot))
}

fn cmd_scan(args: ScanArgs) -> Result<(), CacheError> {
    init_logging(&args.common, "warn");
    let start = Instant::now();
    let (stats, total, snapshot) = scan(&args)?;
    eprintln!(
        "Scanned {} documents in {:.1}ms: {} updated, {} removed, {} unchanged, {} failed",
        stats.documents,
        start.elapsed().as_secs_f64() * 1000.0,
        stats.updated,
        stats.removed,
        stats.skipped,
        stats.failed
    );
    eprintln!("Snapshot: {}", snapshot.display());
    println!("{}", total);
    Ok(())
}

// ─── watch ──────────────────────────────────────────────────────────

fn cmd_watch(args: WatchArgs) -> Result<(), CacheError> {
    init_logging(&args.common, "info");
    let paths = resolve_paths(&args.common)?;
    let cache = open_cache(&args.common, &paths)?;
    let source = cache.source().clone();
    let flush_interval = Duration::from_secs(args.flush_secs.max(1));

    info!(
        dir = %source.root().display(),
        snapshot = %paths.snapshot.display(),
        settings = %paths.settings.display(),
        cached = cache.store().len(),
        "Starting word count service"
    );

    let service = Service::spawn(cache, flush_interval);
    // Subscribe before the startup pass so early changes queue behind it.
    let watcher = start_watcher(source, Some(paths.settings.clone()), service.sender())?;
    service.send(Command::InitialReconcile(Duration::from_millis(args.startup_retry_ms)))?;

    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| CacheError::Io(std::io::Error::other(e.to_string())))?;

    eprintln!("Watching {} (Ctrl-C to stop)", paths.root.display());
    let _ = stop_rx.recv();

    info!("Stopping");
    drop(watcher);
    let query = service.query();
    let outcome = service.shutdown()?;
    eprintln!(
        "Stopped. {} documents, {} words. Final flush: {:?}",
        query.len(),
        query.total(),
        outcome
    );
    Ok(())
}

// ─── get / total ────────────────────────────────────────────────────

pub(crate) fn render_get(
    entries: &BTreeMap<DocumentId, IndexEntry>,
    id: Option<&str>,
    json: bool,
) -> Result<String, CacheError> {
    match id {
        Some(raw) => {
            let id = normalize_id(raw);
            let entry = entries.get(&id)
                .ok_or_else(|| CacheError::InvalidArgs(format!("Document not indexed: {}", id)))?;
            if json {
                Ok(serde_json::to_string_pretty(&serde_json::json!({
                    "id": id,
                    "wordcount": entry.wordcount,
                }))?)
            } else {
                Ok(entry.wordcount.to_string())
            }
        }
        None => {
            if json {
                let counts: BTreeMap<&DocumentId, u64> = entries.iter()
                    .map(|(id, e)| (id, e.wordcount))
                    .collect();
                Ok(serde_json::to_string_pretty(&counts)?)
            } else {
                Ok(entries.iter()
                    .map(|(id, e)| format!("{:>8}  {}", e.wordcount, id))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
    }
}

fn cmd_get(args: GetArgs) -> Result<(), CacheError> {
    init_logging(&args.common, "warn");
    let paths = resolve_paths(&args.common)?;
    let entries = load_snapshot(&paths)?;
    let out = render_get(&entries, args.id.as_deref(), args.json)?;
    if !out.is_empty() {
        println!("{}", out);
    }
    Ok(())
}

fn cmd_total(args: TotalArgs) -> Result<(), CacheError> {
    init_logging(&args.common, "warn");
    let paths = resolve_paths(&args.common)?;
    let entries = load_snapshot(&paths)?;
    let total: u64 = entries.values().map(|e| e.wordcount).sum();
    println!("{}", total);
    Ok(())
}

// ─── config ─────────────────────────────────────────────────────────

/// Apply `--clear` / `--exclude-*` to the settings file. Returns the
/// resulting settings and whether the file was rewritten.
pub(crate) fn update_config(args: &ConfigArgs, settings: &Path) -> Result<(ExclusionConfig, bool), CacheError> {
    let mut config = ExclusionConfig::load(settings)?;
    let changing = args.clear || !args.exclude_folders.is_empty() || !args.exclude_files.is_empty();
    if !changing {
        return Ok((config, false));
    }

    if args.clear {
        config = ExclusionConfig::none();
    }
    for folder in &args.exclude_folders {
        if !config.excluded_folders.iter().any(|f| f.eq_ignore_ascii_case(folder.trim().trim_end_matches('/'))) {
            config.excluded_folders.push(folder.clone());
        }
    }
    for file in &args.exclude_files {
        if !config.excluded_files.iter().any(|f| f.eq_ignore_ascii_case(file.trim())) {
            config.excluded_files.push(file.clone());
        }
    }
    let config = config.normalized();
    config.save(settings)?;
    Ok((config, true))
}

fn cmd_config(args: ConfigArgs) -> Result<(), CacheError> {
    init_logging(&args.common, "warn");
    let paths = resolve_paths(&args.common)?;
    let (config, written) = update_config(&args, &paths.settings)?;
    if written {
        eprintln!("Settings saved to {}", paths.settings.display());
    } else {
        eprintln!("Settings: {}", paths.settings.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

// ─── info ───────────────────────────────────────────────────────────

fn cmd_info(args: InfoArgs) -> Result<(), CacheError> {
    init_logging(&args.common, "warn");
    let paths = resolve_paths(&args.common)?;

    println!("Vault:     {}", paths.root.display());
    println!("Snapshot:  {}", paths.snapshot.display());
    match Persistence::new(&paths.snapshot).load_entries() {
        Ok(Some(entries)) => {
            let size = fs::metadata(&paths.snapshot).map(|m| m.len()).unwrap_or(0);
            let total: u64 = entries.values().map(|e| e.wordcount).sum();
            println!(
                "           {} documents, {} words, {:.1} KB",
                entries.len(),
                total,
                size as f64 / 1024.0
            );
        }
        Ok(None) => println!("           (not created yet)"),
        Err(e) => println!("           unreadable: {}", e),
    }

    println!("Settings:  {}", paths.settings.display());
    let config = ExclusionConfig::load(&paths.settings)?;
    println!("           excluded folders: {:?}", config.excluded_folders);
    println!("           excluded files:   {:?}", config.excluded_files);
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
