//! In-memory document source for embedders and tests.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::CacheError;
use crate::DocumentId;

use super::{DocStat, DocumentSource};

#[derive(Debug, Default)]
struct MemoryState {
    docs: BTreeMap<DocumentId, (String, u64)>,
    reads: usize,
    failing: HashSet<DocumentId>,
    empty_listings: usize,
    listing_fails: bool,
}

/// A document source backed by a shared map. Clones share state, so a test
/// can keep one handle and mutate documents under a running cache.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create or replace a document.
    pub fn insert(&self, id: impl Into<DocumentId>, content: impl Into<String>, mtime: u64) {
        self.lock().docs.insert(id.into(), (content.into(), mtime));
    }

    pub fn remove(&self, id: &DocumentId) -> bool {
        self.lock().docs.remove(id).is_some()
    }

    /// Move a document to a new id, keeping content and mtime.
    pub fn rename(&self, from: &DocumentId, to: impl Into<DocumentId>) -> bool {
        let mut state = self.lock();
        match state.docs.remove(from) {
            Some(doc) => {
                state.docs.insert(to.into(), doc);
                true
            }
            None => false,
        }
    }

    /// Number of `read_content` calls served so far.
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Make `stat`/`read_content` fail with a non-NotFound I/O error for `id`.
    pub fn fail_reads(&self, id: impl Into<DocumentId>) {
        self.lock().failing.insert(id.into());
    }

    pub fn heal_reads(&self, id: &DocumentId) {
        self.lock().failing.remove(id);
    }

    /// The next `n` listings report no documents, as a source that signals
    /// readiness before its listing is populated would.
    pub fn delay_listing(&self, n: usize) {
        self.lock().empty_listings = n;
    }

    /// Make every listing fail.
    pub fn fail_listing(&self, fail: bool) {
        self.lock().listing_fails = fail;
    }
}

fn not_found(id: &DocumentId) -> CacheError {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", id)).into()
}

fn failure(id: &DocumentId) -> CacheError {
    io::Error::other(format!("simulated I/O failure for {}", id)).into()
}

impl DocumentSource for MemorySource {
    fn list_documents(&self) -> Result<Vec<DocumentId>, CacheError> {
        let mut state = self.lock();
        if state.listing_fails {
            return Err(io::Error::other("listing unavailable").into());
        }
        if state.empty_listings > 0 {
            state.empty_listings -= 1;
            return Ok(Vec::new());
        }
        Ok(state.docs.keys().cloned().collect())
    }

    fn stat(&self, id: &DocumentId) -> Result<DocStat, CacheError> {
        let state = self.lock();
        if state.failing.contains(id) {
            return Err(failure(id));
        }
        state.docs.get(id)
            .map(|(_, mtime)| DocStat { mtime: *mtime })
            .ok_or_else(|| not_found(id))
    }

    fn read_content(&self, id: &DocumentId) -> Result<String, CacheError> {
        let mut state = self.lock();
        if state.failing.contains(id) {
            return Err(failure(id));
        }
        state.reads += 1;
        state.docs.get(id)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| not_found(id))
    }

    fn exists(&self, id: &DocumentId) -> bool {
        self.lock().docs.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let a = MemorySource::new();
        let b = a.clone();
        a.insert("x.md", "hello", 1);
        assert!(b.exists(&DocumentId::new("x.md")));
    }

    #[test]
    fn test_delayed_listing() {
        let s = MemorySource::new();
        s.insert("x.md", "hello", 1);
        s.delay_listing(1);
        assert!(s.list_documents().unwrap().is_empty());
        assert_eq!(s.list_documents().unwrap().len(), 1);
    }

    #[test]
    fn test_failing_reads_are_not_not_found() {
        let s = MemorySource::new();
        s.insert("x.md", "hello", 1);
        s.fail_reads("x.md");
        let err = s.read_content(&DocumentId::new("x.md")).unwrap_err();
        assert!(!err.is_not_found());
        s.heal_reads(&DocumentId::new("x.md"));
        assert_eq!(s.read_content(&DocumentId::new("x.md")).unwrap(), "hello");
    }

    #[test]
    fn test_rename_moves_document() {
        let s = MemorySource::new();
        s.insert("a.md", "one two", 7);
        assert!(s.rename(&DocumentId::new("a.md"), "b.md"));
        assert!(!s.exists(&DocumentId::new("a.md")));
        assert_eq!(s.stat(&DocumentId::new("b.md")).unwrap().mtime, 7);
    }

    #[test]
    fn test_reads_counted() {
        let s = MemorySource::new();
        s.insert("a.md", "x", 1);
        let _ = s.read_content(&DocumentId::new("a.md"));
        let _ = s.read_content(&DocumentId::new("a.md"));
        assert_eq!(s.reads(), 2);
    }
}
