//! Full reconciliation: bring the index in line with the document source.
//!
//! Entries for documents that disappeared or became excluded are dropped.
//! Every remaining document is stat'ed and only recounted when its mtime
//! differs from the stored one; unchanged documents are never read.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::counter::is_countable;
use crate::error::CacheError;
use crate::exclusion::{is_excluded, ExclusionConfig};
use crate::source::DocumentSource;
use crate::store::IndexStore;
use crate::updater::compute_entry;
use crate::DocumentId;

/// Counters from one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Countable, non-excluded documents seen in the source.
    pub documents: usize,
    /// Entries inserted or recounted.
    pub updated: usize,
    /// Entries dropped (deleted, vanished or newly excluded).
    pub removed: usize,
    /// Documents whose mtime matched and were not read.
    pub skipped: usize,
    /// Documents whose stat or read failed; their entries were left alone.
    pub failed: usize,
}

impl ReconcileStats {
    /// Number of index entries this pass changed.
    pub fn changed(&self) -> usize {
        self.updated + self.removed
    }
}

/// Run a full reconciliation pass.
///
/// A listing failure aborts the pass before anything is touched. A failure on
/// a single document is logged and that document is skipped.
pub fn reconcile<S: DocumentSource + ?Sized>(
    store: &mut IndexStore,
    source: &S,
    config: &ExclusionConfig,
    extensions: &[String],
) -> Result<ReconcileStats, CacheError> {
    let listed = source.list_documents()?;
    Ok(reconcile_listed(store, source, config, extensions, listed))
}

/// Startup pass. Some sources signal readiness before their listing is
/// populated, so an empty first listing is retried once after `retry_delay`
/// before any cached entry is dropped. A zero delay disables the retry.
pub fn initial_reconcile<S: DocumentSource + ?Sized>(
    store: &mut IndexStore,
    source: &S,
    config: &ExclusionConfig,
    extensions: &[String],
    retry_delay: Duration,
) -> Result<ReconcileStats, CacheError> {
    let mut listed = source.list_documents()?;
    if listed.is_empty() && !retry_delay.is_zero() {
        info!(
            delay_ms = retry_delay.as_millis() as u64,
            "Document source reported no documents, retrying once"
        );
        std::thread::sleep(retry_delay);
        listed = source.list_documents()?;
    }
    Ok(reconcile_listed(store, source, config, extensions, listed))
}

fn reconcile_listed<S: DocumentSource + ?Sized>(
    store: &mut IndexStore,
    source: &S,
    config: &ExclusionConfig,
    extensions: &[String],
    listed: Vec<DocumentId>,
) -> ReconcileStats {
    let start = Instant::now();

    let current: BTreeSet<DocumentId> = listed
        .into_iter()
        .filter(|id| is_countable(id, extensions) && !is_excluded(id, config))
        .collect();

    let mut stats = ReconcileStats { documents: current.len(), ..Default::default() };

    for id in store.ids() {
        if !current.contains(&id) && store.remove(&id) {
            stats.removed += 1;
        }
    }

    for id in &current {
        let mtime = match source.stat(id) {
            Ok(stat) => stat.mtime,
            Err(e) if e.is_not_found() => {
                if store.remove(id) {
                    stats.removed += 1;
                }
                continue;
            }
            Err(e) => {
                warn!(doc = %id, error = %e, "Failed to stat document, keeping cached count");
                stats.failed += 1;
                continue;
            }
        };

        if store.get(id).is_some_and(|entry| entry.mtime == mtime) {
            stats.skipped += 1;
            continue;
        }

        match compute_entry(source, id, mtime) {
            Ok(entry) => {
                store.upsert(id.clone(), entry);
                stats.updated += 1;
            }
            Err(e) if e.is_not_found() => {
                if store.remove(id) {
                    stats.removed += 1;
                }
            }
            Err(e) => {
                warn!(doc = %id, error = %e, "Failed to read document, keeping cached count");
                stats.failed += 1;
            }
        }
    }

    info!(
        documents = stats.documents,
        updated = stats.updated,
        removed = stats.removed,
        skipped = stats.skipped,
        failed = stats.failed,
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Reconciliation complete"
    );
    stats
}
