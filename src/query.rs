//! Read-side handle on the current word counts.
//!
//! The engine publishes a fresh immutable map after every mutation; readers
//! clone the inner `Arc` under a short read lock and never block the writer
//! for longer than a pointer swap.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::store::IndexStore;
use crate::DocumentId;

type CountMap = BTreeMap<DocumentId, u64>;

/// Cheaply cloneable view of the latest published counts.
#[derive(Debug, Clone, Default)]
pub struct WordCounts {
    inner: Arc<RwLock<Arc<CountMap>>>,
}

impl WordCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published map with the store's current counts.
    pub(crate) fn publish(&self, store: &IndexStore) {
        let map: CountMap = store.iter().map(|(id, e)| (id.clone(), e.wordcount)).collect();
        let map = Arc::new(map);
        match self.inner.write() {
            Ok(mut guard) => *guard = map,
            Err(poisoned) => *poisoned.into_inner() = map,
        }
    }

    /// Snapshot of all counts, keyed by document id.
    pub fn counts(&self) -> Arc<CountMap> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Count for one document, `None` if it is not indexed.
    pub fn get(&self, id: &DocumentId) -> Option<u64> {
        self.counts().get(id).copied()
    }

    /// Sum of all indexed counts.
    pub fn total(&self) -> u64 {
        self.counts().values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }
}
