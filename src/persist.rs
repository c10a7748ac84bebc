//! Snapshot persistence: load the index at startup, flush it when dirty.
//!
//! The snapshot is a JSON object mapping document id to
//! `{"wordcount": n, "mtime": ms}`. Writes go to `<path>.tmp` first and are
//! renamed over the snapshot so a crash never leaves a half-written file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::CacheError;
use crate::store::IndexStore;
use crate::{clean_path, semantic_prefix, stable_hash, DocumentId, IndexEntry};

/// Result of a flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Store was clean; nothing written.
    Skipped,
    /// Snapshot written and dirty flag cleared.
    Written,
    /// Write failed; dirty flag left set for the next attempt.
    Failed,
}

/// Default data directory: `<local data dir>/wordcache`.
pub fn data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("wordcache")
}

fn file_stem_for(root: &Path) -> String {
    let canonical = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let canonical = clean_path(&canonical.to_string_lossy());
    let hash = stable_hash(&[canonical.as_bytes()]);
    format!("{}_{:08x}", semantic_prefix(Path::new(&canonical)), hash as u32)
}

/// Snapshot file for a vault root: `<base>/<name>_<hash>.wordcount.json`.
pub fn snapshot_path_for(root: &Path, base: &Path) -> PathBuf {
    base.join(format!("{}.wordcount.json", file_stem_for(root)))
}

/// Settings file for a vault root: `<base>/<name>_<hash>.settings.json`.
pub fn settings_path_for(root: &Path, base: &Path) -> PathBuf {
    base.join(format!("{}.settings.json", file_stem_for(root)))
}

/// Reads and writes the snapshot at a fixed path. The only writer of that file.
#[derive(Debug, Clone)]
pub struct Persistence {
    path: PathBuf,
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.tmp", self.path.display()))
    }

    /// Read the snapshot. `Ok(None)` when no snapshot exists yet.
    pub fn load_entries(&self) -> Result<Option<BTreeMap<DocumentId, IndexEntry>>, CacheError> {
        let path_str = self.path.display().to_string();
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::SnapshotLoad {
                    path: path_str,
                    message: format!("cannot read file: {}", e),
                })
            }
        };
        let entries = serde_json::from_str(&text).map_err(|e| CacheError::SnapshotLoad {
            path: path_str,
            message: format!("deserialization failed: {}", e),
        })?;
        Ok(Some(entries))
    }

    /// Load the persisted index. A missing snapshot gives an empty store; an
    /// unreadable or malformed one is logged and discarded.
    pub fn load(&self) -> IndexStore {
        let start = Instant::now();
        match self.load_entries() {
            Ok(Some(entries)) => {
                info!(
                    path = %self.path.display(),
                    entries = entries.len(),
                    elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
                    "Snapshot loaded"
                );
                IndexStore::from_entries(entries)
            }
            Ok(None) => {
                info!(path = %self.path.display(), "No snapshot found, starting empty");
                IndexStore::new()
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable snapshot, starting empty");
                IndexStore::new()
            }
        }
    }

    /// Serialize the full store and atomically replace the snapshot.
    /// Does not touch the dirty flag.
    pub fn save(&self, store: &IndexStore) -> Result<(), CacheError> {
        let start = Instant::now();
        let path_str = self.path.display().to_string();
        let save_err = |message: String| CacheError::SnapshotSave { path: path_str.clone(), message };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| save_err(format!("cannot create directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(store.entries())?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json.as_bytes())
            .map_err(|e| save_err(format!("cannot write temp file: {}", e)))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| save_err(format!("cannot rename temp file: {}", e)))?;

        info!(
            path = %self.path.display(),
            entries = store.len(),
            bytes = json.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Snapshot saved"
        );
        Ok(())
    }

    /// Write the snapshot if the store is dirty, then clear the flag.
    /// On failure the flag stays set so the next flush retries.
    pub fn flush(&self, store: &mut IndexStore) -> FlushOutcome {
        if !store.is_dirty() {
            return FlushOutcome::Skipped;
        }
        match self.save(store) {
            Ok(()) => {
                store.mark_clean();
                FlushOutcome::Written
            }
            Err(e) => {
                error!(error = %e, "Failed to save word count snapshot");
                FlushOutcome::Failed
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// load(save(X)) == X for any index.
        #[test]
        fn snapshot_roundtrip(
            entries in proptest::collection::btree_map(
                "[a-zA-Z0-9 _/.-]{1,30}",
                (0u64..1_000_000, 0u64..u64::MAX / 2),
                0..40,
            ),
        ) {
            let tmp = tempfile::tempdir().unwrap();
            let persistence = Persistence::new(tmp.path().join("cache.json"));
            let map: BTreeMap<DocumentId, IndexEntry> = entries.into_iter()
                .map(|(k, (w, m))| (DocumentId::new(k), IndexEntry::new(w, m)))
                .collect();
            let store = IndexStore::from_entries(map.clone());

            persistence.save(&store).unwrap();
            let loaded = persistence.load_entries().unwrap().unwrap();
            prop_assert_eq!(loaded, map);
        }
    }
}
