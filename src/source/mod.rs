//! Document sources: where documents are listed, stat'ed and read from.
//!
//! The engine only depends on the [`DocumentSource`] trait and the
//! [`DocumentEvent`] notifications; the filesystem and in-memory sources
//! are the two implementations shipped with the crate.

mod fs;
mod memory;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CacheError;
use crate::DocumentId;

pub use fs::FsSource;
pub use memory::MemorySource;

/// Stat information used for staleness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocStat {
    /// Modification time, milliseconds since the Unix epoch.
    pub mtime: u64,
}

/// A change notification delivered by a document source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    Created(DocumentId),
    Modified(DocumentId),
    Deleted(DocumentId),
    Renamed { from: DocumentId, to: DocumentId },
}

/// Read access to the set of documents being counted.
///
/// A `NotFound` I/O error from `stat` or `read_content` means the document
/// vanished; callers treat it as a delete.
pub trait DocumentSource {
    /// Every document currently in the source.
    fn list_documents(&self) -> Result<Vec<DocumentId>, CacheError>;

    fn stat(&self, id: &DocumentId) -> Result<DocStat, CacheError>;

    fn read_content(&self, id: &DocumentId) -> Result<String, CacheError>;

    fn exists(&self, id: &DocumentId) -> bool;
}

/// Milliseconds since the Unix epoch, saturating to 0 before it.
pub fn system_time_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
