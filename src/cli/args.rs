//! CLI argument structs for all subcommands.

use clap::{Args, Parser};

/// Options shared by every subcommand: which vault, which files, where the
/// snapshot and settings live, and how to log.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Vault directory containing the notes
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// File extensions to count, comma-separated
    #[arg(short, long, default_value = "md")]
    pub ext: String,

    /// Snapshot file (default: per-vault file under the local data dir)
    #[arg(long)]
    pub cache_file: Option<String>,

    /// Exclusion settings file (default: per-vault file under the local data dir)
    #[arg(long)]
    pub config: Option<String>,

    /// Include hidden files and folders
    #[arg(long)]
    pub hidden: bool,

    /// Also count .gitignore'd files
    #[arg(long)]
    pub no_ignore: bool,

    /// Number of parallel threads for listing (0 = auto)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Log level for stderr output (error, warn, info, debug).
    /// Defaults to info for `watch` and warn otherwise.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl CommonArgs {
    pub fn extensions(&self) -> Vec<String> {
        self.ext.split(',')
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  Count a vault:              wordcache scan -d ~/notes
  Custom snapshot location:   wordcache scan -d ~/notes --cache-file /tmp/notes.json
  Count .md and .txt:         wordcache scan -d ~/notes -e md,txt

Only documents whose modification time changed since the last snapshot are
re-read. The first scan of a vault reads every document."#)]
pub struct ScanArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Retry an empty first listing once after this many ms (0 = no retry)
    #[arg(long, default_value = "0")]
    pub startup_retry_ms: u64,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  Keep counts live:           wordcache watch -d ~/notes
  Flush every 30 seconds:     wordcache watch -d ~/notes --flush-secs 30
  Verbose logs:               wordcache watch -d ~/notes --log-level debug

Runs until Ctrl-C. Edits to the exclusion settings file are picked up
while running. The snapshot is flushed on exit."#)]
pub struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Seconds between snapshot flushes (only written when counts changed)
    #[arg(long, default_value = "5")]
    pub flush_secs: u64,

    /// Retry an empty first listing once after this many ms (0 = no retry)
    #[arg(long, default_value = "1000")]
    pub startup_retry_ms: u64,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  One document:               wordcache get notes/todo.md -d ~/notes
  Every document as JSON:     wordcache get -d ~/notes --json

Reads the last snapshot; run 'wordcache scan' first to refresh it."#)]
pub struct GetArgs {
    /// Document id (path relative to the vault, '/'-separated). Omit for all.
    pub id: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct TotalArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  Show settings:              wordcache config -d ~/notes
  Exclude a folder:           wordcache config -d ~/notes --exclude-folder Archive
  Exclude a file:             wordcache config -d ~/notes --exclude-file README
  Reset to no exclusions:     wordcache config -d ~/notes --clear

Folders match as path prefixes, files by name with or without extension.
Both are case-insensitive. A running 'watch' reloads the file on change."#)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Add an excluded folder (repeatable)
    #[arg(long = "exclude-folder")]
    pub exclude_folders: Vec<String>,

    /// Add an excluded file name (repeatable)
    #[arg(long = "exclude-file")]
    pub exclude_files: Vec<String>,

    /// Remove all exclusions before adding new ones
    #[arg(long)]
    pub clear: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}
