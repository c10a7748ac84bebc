//! Unified error type for the word-count cache.

use thiserror::Error;

/// All errors that can occur in cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error (document read/stat, snapshot or settings access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (snapshot, settings)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory does not exist
    #[error("Directory does not exist: {0}")]
    DirNotFound(String),

    /// Failed to load a snapshot from disk
    #[error("Failed to load snapshot from {path}: {message}")]
    SnapshotLoad { path: String, message: String },

    /// Failed to write a snapshot to disk
    #[error("Failed to save snapshot to {path}: {message}")]
    SnapshotSave { path: String, message: String },

    /// Filesystem watcher could not be started
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Mutually exclusive flags or other argument validation error
    #[error("{0}")]
    InvalidArgs(String),

    /// The cache service thread has exited and no longer accepts commands
    #[error("Cache service is no longer running")]
    ServiceStopped,
}

impl CacheError {
    /// True when the underlying cause is a missing file or directory.
    /// Callers treat this as an implicit delete rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = CacheError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_dir_not_found_display() {
        let err = CacheError::DirNotFound("/nonexistent".to_string());
        assert!(err.to_string().contains("/nonexistent"));
    }

    #[test]
    fn test_snapshot_load_display() {
        let err = CacheError::SnapshotLoad {
            path: "/tmp/cache.json".to_string(),
            message: "expected value at line 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/cache.json"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Json(_)));
    }

    #[test]
    fn test_is_not_found() {
        let missing: CacheError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        let denied: CacheError = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no").into();
        assert!(missing.is_not_found());
        assert!(!denied.is_not_found());
        assert!(!CacheError::ServiceStopped.is_not_found());
    }
}
