//! Exclusion rules: which documents never enter the index.
//!
//! The rules live in a small JSON settings file, kept apart from the
//! snapshot, with the shape `{"excludedFolders": [...], "excludedFiles": [...]}`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CacheError;
use crate::DocumentId;

fn default_excluded_folders() -> Vec<String> {
    vec!["Templates".to_string(), ".trash".to_string()]
}

/// Excluded folder prefixes and file basenames. Compared case-insensitively.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionConfig {
    #[serde(default = "default_excluded_folders")]
    pub excluded_folders: Vec<String>,
    #[serde(default)]
    pub excluded_files: Vec<String>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            excluded_folders: default_excluded_folders(),
            excluded_files: Vec::new(),
        }
    }
}

impl ExclusionConfig {
    /// A config that excludes nothing.
    pub fn none() -> Self {
        Self { excluded_folders: Vec::new(), excluded_files: Vec::new() }
    }

    /// Build a config from newline-separated text, one entry per line.
    pub fn from_lines(folders: &str, files: &str) -> Self {
        let split = |text: &str| -> Vec<String> {
            text.lines()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        Self { excluded_folders: split(folders), excluded_files: split(files) }
    }

    /// Trim entries, drop empty ones and strip trailing `/` from folders.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let folders = self.excluded_folders.iter()
            .map(|f| f.trim().trim_end_matches('/').to_string())
            .filter(|f| !f.is_empty())
            .collect();
        let files = self.excluded_files.iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        Self { excluded_folders: folders, excluded_files: files }
    }

    /// Load settings from `path`. A missing file yields the defaults;
    /// missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let config: Self = serde_json::from_str(&text)?;
        Ok(config.normalized())
    }

    /// Write settings to `path` (pretty JSON), creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(
            path = %path.display(),
            folders = self.excluded_folders.len(),
            files = self.excluded_files.len(),
            "Exclusion settings saved"
        );
        Ok(())
    }
}

/// True when `id` lies under an excluded folder or its basename is an
/// excluded file. Entries naming the full file name (with extension) match too.
pub fn is_excluded(id: &DocumentId, config: &ExclusionConfig) -> bool {
    let path = id.as_str().to_lowercase();

    let in_folder = config.excluded_folders.iter()
        .map(|f| f.trim().trim_end_matches('/'))
        .filter(|f| !f.is_empty())
        .any(|folder| {
            let folder = folder.to_lowercase();
            path.len() > folder.len()
                && path.starts_with(&folder)
                && path.as_bytes()[folder.len()] == b'/'
        });
    if in_folder {
        return true;
    }

    let basename = id.basename().to_lowercase();
    let file_name = id.file_name().to_lowercase();
    config.excluded_files.iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .any(|f| f == basename || f == file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(folders: &[&str], files: &[&str]) -> ExclusionConfig {
        ExclusionConfig {
            excluded_folders: folders.iter().map(|s| s.to_string()).collect(),
            excluded_files: files.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_folder_prefix_excluded() {
        let c = cfg(&["Templates"], &[]);
        assert!(is_excluded(&DocumentId::new("Templates/a.md"), &c));
        assert!(is_excluded(&DocumentId::new("Templates/deep/b.md"), &c));
    }

    #[test]
    fn test_folder_prefix_requires_separator() {
        let c = cfg(&["Templates"], &[]);
        assert!(!is_excluded(&DocumentId::new("Templates2/a.md"), &c));
        assert!(!is_excluded(&DocumentId::new("TemplatesNotes.md"), &c));
        assert!(!is_excluded(&DocumentId::new("notes/Templates/a.md"), &c));
    }

    #[test]
    fn test_folder_case_insensitive() {
        let c = cfg(&["templates"], &[]);
        assert!(is_excluded(&DocumentId::new("TEMPLATES/a.md"), &c));
    }

    #[test]
    fn test_nested_folder_entry() {
        let c = cfg(&["Archive/2020/"], &[]);
        assert!(is_excluded(&DocumentId::new("archive/2020/jan.md"), &c));
        assert!(!is_excluded(&DocumentId::new("archive/2021/jan.md"), &c));
    }

    #[test]
    fn test_excluded_file_by_basename() {
        let c = cfg(&[], &["Scratch"]);
        assert!(is_excluded(&DocumentId::new("scratch.md"), &c));
        assert!(is_excluded(&DocumentId::new("inbox/SCRATCH.md"), &c));
        assert!(!is_excluded(&DocumentId::new("scratchpad.md"), &c));
    }

    #[test]
    fn test_excluded_file_by_full_name() {
        let c = cfg(&[], &["todo.md"]);
        assert!(is_excluded(&DocumentId::new("lists/Todo.md"), &c));
    }

    #[test]
    fn test_empty_config_excludes_nothing() {
        let c = ExclusionConfig::none();
        assert!(!is_excluded(&DocumentId::new("Templates/a.md"), &c));
    }

    #[test]
    fn test_blank_entries_ignored() {
        let c = cfg(&["", "  "], &[" "]);
        assert!(!is_excluded(&DocumentId::new("a.md"), &c));
        assert!(!is_excluded(&DocumentId::new("/a.md"), &c));
    }

    #[test]
    fn test_default_excludes_templates_and_trash() {
        let c = ExclusionConfig::default();
        assert!(is_excluded(&DocumentId::new("Templates/daily.md"), &c));
        assert!(is_excluded(&DocumentId::new(".trash/old.md"), &c));
        assert!(!is_excluded(&DocumentId::new("notes/a.md"), &c));
    }

    #[test]
    fn test_from_lines_trims_and_drops_blank() {
        let c = ExclusionConfig::from_lines("Templates\n  Archive  \n\n", "\nscratch\n");
        assert_eq!(c.excluded_folders, vec!["Templates", "Archive"]);
        assert_eq!(c.excluded_files, vec!["scratch"]);
    }

    #[test]
    fn test_settings_json_shape() {
        let c = cfg(&["Templates"], &["scratch"]);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json, serde_json::json!({
            "excludedFolders": ["Templates"],
            "excludedFiles": ["scratch"],
        }));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let c = ExclusionConfig::load(&tmp.path().join("settings.json")).unwrap();
        assert_eq!(c, ExclusionConfig::default());
    }

    #[test]
    fn test_load_partial_settings_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"excludedFiles": ["scratch"]}"#).unwrap();
        let c = ExclusionConfig::load(&path).unwrap();
        assert_eq!(c.excluded_folders, vec!["Templates", ".trash"]);
        assert_eq!(c.excluded_files, vec!["scratch"]);
    }

    #[test]
    fn test_load_malformed_settings_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(ExclusionConfig::load(&path), Err(CacheError::Json(_))));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let c = cfg(&["Archive"], &["scratch"]);
        c.save(&path).unwrap();
        assert_eq!(ExclusionConfig::load(&path).unwrap(), c);
    }
}
