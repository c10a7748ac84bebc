//! Incremental updates: apply a single document change to the index.
//!
//! These handlers never reconcile. A failure leaves the affected key exactly
//! as it was; a document that vanished before it could be read is removed.

use tracing::{debug, warn};

use crate::counter::{count_words, is_countable};
use crate::error::CacheError;
use crate::exclusion::{is_excluded, ExclusionConfig};
use crate::source::{DocumentEvent, DocumentSource};
use crate::store::IndexStore;
use crate::{DocumentId, IndexEntry};

/// What a handler did to the index for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Entry inserted or replaced with a fresh count.
    Updated(IndexEntry),
    /// Entry removed.
    Removed,
    /// Document is excluded or not a countable type; nothing done.
    Ignored,
    /// Recomputed entry matched the stored one, or nothing to remove.
    Unchanged,
    /// Read/stat failure; prior state kept.
    Failed,
}

impl UpdateOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, UpdateOutcome::Updated(_) | UpdateOutcome::Removed)
    }
}

/// Read a document and count it, tagging the result with `mtime`.
pub fn compute_entry<S: DocumentSource + ?Sized>(
    source: &S,
    id: &DocumentId,
    mtime: u64,
) -> Result<IndexEntry, CacheError> {
    let content = source.read_content(id)?;
    Ok(IndexEntry::new(count_words(&content), mtime))
}

fn on_failure(store: &mut IndexStore, id: &DocumentId, err: CacheError) -> UpdateOutcome {
    if err.is_not_found() {
        debug!(doc = %id, "Document vanished before it could be read, treating as deleted");
        if store.remove(id) { UpdateOutcome::Removed } else { UpdateOutcome::Unchanged }
    } else {
        warn!(doc = %id, error = %err, "Failed to update word count");
        UpdateOutcome::Failed
    }
}

/// Recount one document. `mtime` is fetched from the source when not supplied.
pub fn update_file<S: DocumentSource + ?Sized>(
    store: &mut IndexStore,
    source: &S,
    config: &ExclusionConfig,
    extensions: &[String],
    id: &DocumentId,
    mtime: Option<u64>,
) -> UpdateOutcome {
    if !is_countable(id, extensions) || is_excluded(id, config) {
        return UpdateOutcome::Ignored;
    }

    let mtime = match mtime {
        Some(m) => m,
        None => match source.stat(id) {
            Ok(stat) => stat.mtime,
            Err(e) => return on_failure(store, id, e),
        },
    };

    let entry = match compute_entry(source, id, mtime) {
        Ok(entry) => entry,
        Err(e) => return on_failure(store, id, e),
    };

    if store.get(id) == Some(&entry) {
        return UpdateOutcome::Unchanged;
    }
    debug!(doc = %id, words = entry.wordcount, mtime = entry.mtime, "Word count updated");
    store.upsert(id.clone(), entry);
    UpdateOutcome::Updated(entry)
}

/// Drop a document from the index if present.
pub fn remove_file(store: &mut IndexStore, id: &DocumentId) -> UpdateOutcome {
    if store.remove(id) {
        debug!(doc = %id, "Word count removed");
        UpdateOutcome::Removed
    } else {
        UpdateOutcome::Unchanged
    }
}

/// Dispatch a source notification. A rename removes the old id first and
/// then counts the new one, so renaming into an excluded folder leaves no entry.
pub fn apply_event<S: DocumentSource + ?Sized>(
    store: &mut IndexStore,
    source: &S,
    config: &ExclusionConfig,
    extensions: &[String],
    event: &DocumentEvent,
) -> Vec<(DocumentId, UpdateOutcome)> {
    match event {
        DocumentEvent::Created(id) | DocumentEvent::Modified(id) => {
            vec![(id.clone(), update_file(store, source, config, extensions, id, None))]
        }
        DocumentEvent::Deleted(id) => vec![(id.clone(), remove_file(store, id))],
        DocumentEvent::Renamed { from, to } => {
            let removed = remove_file(store, from);
            let added = update_file(store, source, config, extensions, to, None);
            vec![(from.clone(), removed), (to.clone(), added)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;

    fn md() -> Vec<String> {
        vec!["md".to_string()]
    }

    fn id(s: &str) -> DocumentId {
        DocumentId::new(s)
    }

    fn templates() -> ExclusionConfig {
        ExclusionConfig { excluded_folders: vec!["Templates".to_string()], excluded_files: vec![] }
    }

    #[test]
    fn test_update_new_file() {
        let source = MemorySource::new();
        source.insert("a.md", "one two three", 10);
        let mut store = IndexStore::new();

        let outcome = update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        assert_eq!(outcome, UpdateOutcome::Updated(IndexEntry::new(3, 10)));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_update_uses_supplied_mtime() {
        let source = MemorySource::new();
        source.insert("a.md", "one", 10);
        let mut store = IndexStore::new();
        update_file(&mut store, &source, &templates(), &md(), &id("a.md"), Some(99));
        assert_eq!(store.get(&id("a.md")).unwrap().mtime, 99);
    }

    #[test]
    fn test_update_excluded_is_noop() {
        let source = MemorySource::new();
        source.insert("Templates/a.md", "one two", 10);
        let mut store = IndexStore::new();

        let outcome = update_file(&mut store, &source, &templates(), &md(), &id("Templates/a.md"), None);

        assert_eq!(outcome, UpdateOutcome::Ignored);
        assert!(store.is_empty());
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_update_non_countable_is_noop() {
        let source = MemorySource::new();
        source.insert("pic.png", "binary", 10);
        let mut store = IndexStore::new();
        let outcome = update_file(&mut store, &source, &templates(), &md(), &id("pic.png"), None);
        assert_eq!(outcome, UpdateOutcome::Ignored);
    }

    #[test]
    fn test_update_identical_entry_does_not_dirty() {
        let source = MemorySource::new();
        source.insert("a.md", "one two", 10);
        let mut store = IndexStore::new();
        update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);
        store.mark_clean();

        let outcome = update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_read_failure_keeps_prior_entry() {
        let source = MemorySource::new();
        source.insert("a.md", "one two", 10);
        let mut store = IndexStore::new();
        update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        source.insert("a.md", "one two three four", 20);
        source.fail_reads("a.md");
        let outcome = update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        assert_eq!(outcome, UpdateOutcome::Failed);
        assert_eq!(store.get(&id("a.md")), Some(&IndexEntry::new(2, 10)));
    }

    #[test]
    fn test_missing_document_is_implicit_delete() {
        let source = MemorySource::new();
        source.insert("a.md", "one two", 10);
        let mut store = IndexStore::new();
        update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        source.remove(&id("a.md"));
        let outcome = update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        assert_eq!(outcome, UpdateOutcome::Removed);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_file() {
        let mut store = IndexStore::new();
        store.upsert(id("a.md"), IndexEntry::new(4, 1));
        assert_eq!(remove_file(&mut store, &id("a.md")), UpdateOutcome::Removed);
        assert_eq!(remove_file(&mut store, &id("a.md")), UpdateOutcome::Unchanged);
    }

    #[test]
    fn test_rename_moves_entry() {
        let source = MemorySource::new();
        source.insert("a.md", "one two three four five", 10);
        let mut store = IndexStore::new();
        update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);

        source.rename(&id("a.md"), "b.md");
        let reads_before = source.reads();
        let event = DocumentEvent::Renamed { from: id("a.md"), to: id("b.md") };
        let outcomes = apply_event(&mut store, &source, &templates(), &md(), &event);

        assert_eq!(outcomes[0], (id("a.md"), UpdateOutcome::Removed));
        assert!(!store.contains(&id("a.md")));
        assert_eq!(store.get(&id("b.md")).unwrap().wordcount, 5);
        assert_eq!(source.reads(), reads_before + 1, "renamed document is freshly counted");
    }

    #[test]
    fn test_rename_into_excluded_folder_drops_total() {
        let source = MemorySource::new();
        source.insert("a.md", "one two three four five", 10);
        source.insert("b.md", "six seven", 10);
        let mut store = IndexStore::new();
        update_file(&mut store, &source, &templates(), &md(), &id("a.md"), None);
        update_file(&mut store, &source, &templates(), &md(), &id("b.md"), None);
        let before = store.total();

        source.rename(&id("a.md"), "Templates/a.md");
        let event = DocumentEvent::Renamed { from: id("a.md"), to: id("Templates/a.md") };
        apply_event(&mut store, &source, &templates(), &md(), &event);

        assert_eq!(store.total(), before - 5);
        assert!(!store.contains(&id("a.md")));
        assert!(!store.contains(&id("Templates/a.md")));
    }

    #[test]
    fn test_created_and_deleted_events() {
        let source = MemorySource::new();
        source.insert("n.md", "hello", 3);
        let mut store = IndexStore::new();

        apply_event(&mut store, &source, &templates(), &md(), &DocumentEvent::Created(id("n.md")));
        assert_eq!(store.total(), 1);

        source.insert("n.md", "hello there world", 4);
        apply_event(&mut store, &source, &templates(), &md(), &DocumentEvent::Modified(id("n.md")));
        assert_eq!(store.total(), 3);

        apply_event(&mut store, &source, &templates(), &md(), &DocumentEvent::Deleted(id("n.md")));
        assert!(store.is_empty());
    }
}
