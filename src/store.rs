//! In-memory index: document id → (word count, mtime), with a dirty flag.

use std::collections::BTreeMap;

use crate::{DocumentId, IndexEntry};

/// The word-count index. Owned by a single mutator; every mutation that
/// changes the map sets `dirty` until the persistence layer clears it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStore {
    entries: BTreeMap<DocumentId, IndexEntry>,
    dirty: bool,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store built from persisted state. Starts clean.
    pub fn from_entries(entries: BTreeMap<DocumentId, IndexEntry>) -> Self {
        Self { entries, dirty: false }
    }

    /// Insert or overwrite an entry. Always marks the store dirty.
    pub fn upsert(&mut self, id: DocumentId, entry: IndexEntry) {
        self.entries.insert(id, entry);
        self.dirty = true;
    }

    /// Remove an entry. Marks the store dirty only if something was removed.
    pub fn remove(&mut self, id: &DocumentId) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.dirty = true;
        }
        removed
    }

    pub fn get(&self, id: &DocumentId) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &IndexEntry)> {
        self.entries.iter()
    }

    /// Snapshot of the current keys, for passes that mutate while walking.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.entries.keys().cloned().collect()
    }

    pub fn entries(&self) -> &BTreeMap<DocumentId, IndexEntry> {
        &self.entries
    }

    /// Sum of all word counts.
    pub fn total(&self) -> u64 {
        self.entries.values().map(|e| e.wordcount).sum()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful persist.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
