//! # wordcache — Incremental Word-Count Index
//!
//! Keeps a per-document word count for a tree of Markdown notes in sync with
//! the notes themselves. Counts are persisted to a JSON snapshot, invalidated
//! by modification time, rebuilt by a full reconciliation pass on startup and
//! patched by filesystem events afterwards.
//!
//! ## Library usage
//!
//! The crate ships a `wordcache` CLI, but the engine is exposed as a library
//! so other tools can embed it and read counts through [`WordCounts`].
//!
//! ```
//! use wordcache::{count_words, DocumentId, ExclusionConfig, MemorySource, Persistence, WordCountCache};
//!
//! let source = MemorySource::new();
//! source.insert("notes/a.md", "---\ntitle: X\n---\nHello world foo", 1);
//!
//! let tmp = std::env::temp_dir().join("wordcache_doctest_snapshot.json");
//! let mut cache = WordCountCache::open(source, ExclusionConfig::default(), Persistence::new(&tmp));
//! cache.reconcile().unwrap();
//!
//! let counts = cache.query();
//! assert_eq!(counts.get(&DocumentId::new("notes/a.md")), Some(3));
//! assert_eq!(counts.total(), 3);
//! assert_eq!(count_words("one  two\n\nthree"), 3);
//! # let _ = std::fs::remove_file(&tmp);
//! ```

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

pub mod counter;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod persist;
pub mod query;
pub mod reconcile;
pub mod service;
pub mod source;
pub mod store;
pub mod updater;
pub mod watcher;

pub use counter::{count_words, is_countable, strip_front_matter};
pub use engine::WordCountCache;
pub use error::CacheError;
pub use exclusion::{is_excluded, ExclusionConfig};
pub use persist::{FlushOutcome, Persistence};
pub use query::WordCounts;
pub use reconcile::ReconcileStats;
pub use service::{Command, Service, ServiceHandle};
pub use source::{DocStat, DocumentEvent, DocumentSource, FsSource, MemorySource};
pub use store::IndexStore;
pub use updater::UpdateOutcome;

/// Extensions counted when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md"];

// ─── Stable hashing ─────────────────────────────────────────────────

/// Stable FNV-1a hash (deterministic across Rust versions, unlike `DefaultHasher`).
///
/// Used to derive snapshot and settings file names from the vault root.
#[must_use]
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = FNV_OFFSET;
    for part in parts {
        for &byte in *part {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Human-readable file name prefix for a vault root: its last path component,
/// reduced to ASCII alphanumerics, `-` and `_`. Falls back to `root`.
#[must_use]
pub fn semantic_prefix(root: &Path) -> String {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "root".to_string()
    } else {
        cleaned.to_lowercase()
    }
}

// ─── Paths and content ───────────────────────────────────────────────

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
#[must_use]
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}

/// Read a file as a String, using lossy UTF-8 conversion for non-UTF8 files.
/// Returns `(content, was_lossy)` where `was_lossy` is true if replacement
/// characters were inserted.
pub fn read_file_lossy(path: &Path) -> std::io::Result<(String, bool)> {
    let raw = std::fs::read(path)?;
    match String::from_utf8(raw) {
        Ok(s) => Ok((s, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}

// ─── Core public types ───────────────────────────────────────────────

/// Stable identifier of a document: its `/`-separated path relative to the
/// source root. Used uniformly by the store, events and removal logic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from a path relative to the source root.
    /// Returns `None` for paths that escape the root or are absolute.
    pub fn from_relative_path(path: &Path) -> Option<Self> {
        let mut parts: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        if parts.is_empty() {
            return None;
        }
        Some(Self(parts.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, e.g. `a.md` for `notes/a.md`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its final extension, e.g. `a` for `notes/a.md`.
    pub fn basename(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(dot) => &name[..dot],
        }
    }

    /// Final extension without the dot, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(dot) => Some(&name[dot + 1..]),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Last computed word count of a document and the modification time
/// (milliseconds since the Unix epoch) it was computed from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub wordcount: u64,
    pub mtime: u64,
}

impl IndexEntry {
    pub fn new(wordcount: u64, mtime: u64) -> Self {
        Self { wordcount, mtime }
    }
}

#[cfg(test)]
mod lib_tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_clean_path_strips_prefix() {
        assert_eq!(clean_path(r"\\?\C:\Users\test"), r"C:\Users\test");
    }

    #[test]
    fn test_clean_path_no_prefix() {
        assert_eq!(clean_path("/home/notes"), "/home/notes");
    }

    #[test]
    fn test_stable_hash_deterministic() {
        let a = stable_hash(&[b"/home/notes"]);
        let b = stable_hash(&[b"/home/notes"]);
        assert_eq!(a, b, "same input must produce same hash");
    }

    #[test]
    fn test_stable_hash_multi_part_equivalent_to_concat() {
        let split = stable_hash(&[b"hello", b"world"]);
        let concat = stable_hash(&[b"helloworld"]);
        assert_eq!(split, concat);
    }

    #[test]
    fn test_stable_hash_known_fnv1a_vector() {
        assert_eq!(stable_hash(&[]), 0xcbf2_9ce4_8422_2325);
    }

    #[test]
    fn test_semantic_prefix() {
        assert_eq!(semantic_prefix(Path::new("/home/me/My Vault")), "my_vault");
        assert_eq!(semantic_prefix(Path::new("/")), "root");
        assert_eq!(semantic_prefix(Path::new("notes-2024")), "notes-2024");
    }

    #[test]
    fn test_document_id_parts() {
        let id = DocumentId::new("Projects/Plan.v2.md");
        assert_eq!(id.file_name(), "Plan.v2.md");
        assert_eq!(id.basename(), "Plan.v2");
        assert_eq!(id.extension(), Some("md"));
    }

    #[test]
    fn test_document_id_dotfile_has_no_extension() {
        let id = DocumentId::new(".hidden");
        assert_eq!(id.basename(), ".hidden");
        assert_eq!(id.extension(), None);
    }

    #[test]
    fn test_document_id_from_relative_path() {
        let id = DocumentId::from_relative_path(&PathBuf::from("notes").join("daily").join("a.md"));
        assert_eq!(id, Some(DocumentId::new("notes/daily/a.md")));
        assert_eq!(DocumentId::from_relative_path(Path::new("../escape.md")), None);
        assert_eq!(DocumentId::from_relative_path(Path::new("")), None);
    }

    #[test]
    fn test_index_entry_json_shape() {
        let json = serde_json::to_value(IndexEntry::new(42, 1_700_000_000_000)).unwrap();
        assert_eq!(json, serde_json::json!({ "wordcount": 42, "mtime": 1_700_000_000_000u64 }));
    }

    #[test]
    fn test_document_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&DocumentId::new("a.md")).unwrap();
        assert_eq!(json, "\"a.md\"");
    }

    #[test]
    fn test_read_file_lossy_replaces_invalid_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("latin1.md");
        std::fs::write(&path, b"caf\xe9 au lait").unwrap();
        let (content, lossy) = read_file_lossy(&path).unwrap();
        assert!(lossy);
        assert_eq!(count_words(&content), 3);
    }
}

// ─── Property-based tests (proptest) ─────────────────────────────────
