//! Filesystem watcher: turns notify events under the vault root into
//! service [`Command`]s, and reloads exclusion settings when their file changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::counter::is_countable;
use crate::error::CacheError;
use crate::exclusion::ExclusionConfig;
use crate::service::Command;
use crate::source::{DocumentEvent, FsSource};
use crate::{clean_path, DocumentId};

/// Keeps the OS watcher alive. Dropping it stops event delivery and lets the
/// forwarding thread exit.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
}

fn countable(source: &FsSource, id: &DocumentId) -> bool {
    is_countable(id, source.extensions())
}

/// Id of a file the source would list. Hidden and ignored files are skipped
/// here exactly as the walker skips them, so events never add an entry a
/// reconcile would drop.
fn listed_id(source: &FsSource, path: &Path) -> Option<DocumentId> {
    if source.is_listed(path) { source.id_for(path) } else { None }
}

/// Id of a countable path that may hold an entry. Removal never adds one,
/// so no listing rules apply.
fn removed_id(source: &FsSource, path: &Path) -> Option<DocumentId> {
    source.id_for(path).filter(|id| countable(source, id))
}

/// A path under the root that the walker would descend into or list.
fn is_visible(source: &FsSource, path: &Path) -> bool {
    source.id_for(path).is_some() && !source.is_hidden(path)
}

/// A directory under the root whose contents a walk would visit.
fn is_walked_dir(source: &FsSource, path: &Path) -> bool {
    path.is_dir() && is_visible(source, path)
}

/// Translate one notify event into commands for the cache service.
///
/// Create and modify events for listed files become `Created`/`Modified`.
/// Renames inside the root become `Renamed`; a rename across the root boundary
/// becomes a plain create or delete. Directory moves and removals cannot be
/// expanded into per-file events, so they request one full reconcile.
pub fn map_event(source: &FsSource, event: &Event) -> Vec<Command> {
    let mut out = Vec::new();
    let mut reconcile = false;

    match &event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                if path.is_dir() {
                    // Files moved in with the directory produce no events of their own.
                    reconcile |= is_walked_dir(source, path);
                } else if let Some(id) = listed_id(source, path) {
                    out.push(Command::Event(DocumentEvent::Created(id)));
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let (from_path, to_path) = (&event.paths[0], &event.paths[1]);
            if to_path.is_dir() {
                reconcile = is_visible(source, from_path) || is_walked_dir(source, to_path);
            } else {
                match (removed_id(source, from_path), listed_id(source, to_path)) {
                    (Some(from), Some(to)) => out.push(Command::Event(DocumentEvent::Renamed { from, to })),
                    (Some(from), None) => out.push(Command::Event(DocumentEvent::Deleted(from))),
                    (None, Some(to)) => out.push(Command::Event(DocumentEvent::Created(to))),
                    (None, None) => {}
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
            for path in &event.paths {
                if let Some(id) = removed_id(source, path) {
                    out.push(Command::Event(DocumentEvent::Deleted(id)));
                } else if may_be_directory(event) && is_visible(source, path) {
                    // The path is gone, so a folder (even one named `2024.01`)
                    // cannot be told apart from a non-countable file.
                    reconcile = true;
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                if path.is_dir() {
                    reconcile |= is_walked_dir(source, path);
                } else if let Some(id) = listed_id(source, path) {
                    out.push(Command::Event(DocumentEvent::Created(id)));
                }
            }
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => {}
        EventKind::Modify(_) => {
            for path in &event.paths {
                if path.is_dir() {
                    continue;
                }
                if let Some(id) = listed_id(source, path) {
                    out.push(Command::Event(DocumentEvent::Modified(id)));
                }
            }
        }
        _ => {}
    }

    if reconcile {
        out.push(Command::Reconcile);
    }
    out
}

/// Only a remove event that names a file rules out a vanished directory.
fn may_be_directory(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Remove(RemoveKind::File))
}

/// Absolute, cleaned form of `path` for comparison against notify paths.
fn normalize(path: &Path) -> PathBuf {
    let absolute = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    };
    PathBuf::from(clean_path(&absolute.to_string_lossy()))
}

/// Watch the vault root recursively (and the settings file, if given) and
/// forward translated commands to `commands`.
pub fn start_watcher(
    source: FsSource,
    settings_path: Option<PathBuf>,
    commands: Sender<Command>,
) -> Result<WatchHandle, CacheError> {
    let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(source.root(), RecursiveMode::Recursive)?;

    let settings_path = match settings_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let path = normalize(&path);
            if let Some(parent) = path.parent() {
                watcher.watch(parent, RecursiveMode::NonRecursive)?;
            }
            Some(path)
        }
        None => None,
    };

    info!(
        dir = %source.root().display(),
        settings = ?settings_path.as_ref().map(|p| p.display().to_string()),
        "File watcher started"
    );

    std::thread::spawn(move || {
        for result in rx {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "File watcher error");
                    continue;
                }
            };

            if let Some(settings) = &settings_path {
                let touches_settings = event.paths.iter()
                    .any(|p| PathBuf::from(clean_path(&p.to_string_lossy())) == *settings);
                if touches_settings && !matches!(event.kind, EventKind::Access(_)) {
                    match ExclusionConfig::load(settings) {
                        Ok(config) => {
                            if commands.send(Command::SetConfig(config)).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "Ignoring unreadable exclusion settings"),
                    }
                    continue;
                }
            }

            for command in map_event(&source, &event) {
                debug!(command = ?command, "Forwarding watcher event");
                if commands.send(command).is_err() {
                    info!("Cache service stopped, file watcher exiting");
                    return;
                }
            }
        }
        info!("Watcher channel disconnected, stopping");
    });

    Ok(WatchHandle { _watcher: watcher })
}
