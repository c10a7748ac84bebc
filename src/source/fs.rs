//! Filesystem-backed document source rooted at a vault directory.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::{Match, WalkBuilder};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::{clean_path, read_file_lossy, DocumentId};

use super::{system_time_millis, DocStat, DocumentSource};

/// Documents are the files under `root` whose extension is in `extensions`.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    extensions: Vec<String>,
    hidden: bool,
    no_ignore: bool,
    threads: usize,
}

impl FsSource {
    /// Create a source for `dir`. Fails if the directory does not exist.
    pub fn new(dir: &str, extensions: Vec<String>) -> Result<Self, CacheError> {
        let path = Path::new(dir);
        if !path.is_dir() {
            return Err(CacheError::DirNotFound(dir.to_string()));
        }
        let root = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let root = PathBuf::from(clean_path(&root.to_string_lossy()));
        let extensions = extensions.into_iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Ok(Self { root, extensions, hidden: false, no_ignore: false, threads: 0 })
    }

    /// Include hidden files and directories in listings.
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Also list `.gitignore`'d files.
    pub fn with_no_ignore(mut self, no_ignore: bool) -> Self {
        self.no_ignore = no_ignore;
        self
    }

    /// Walker threads (0 = auto).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Absolute path of a document.
    pub fn path_for(&self, id: &DocumentId) -> PathBuf {
        id.as_str().split('/').fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Document id for an absolute path under the root, if it is one.
    pub fn id_for(&self, path: &Path) -> Option<DocumentId> {
        let cleaned = PathBuf::from(clean_path(&path.to_string_lossy()));
        let relative = cleaned.strip_prefix(&self.root).ok()?;
        DocumentId::from_relative_path(relative)
    }

    fn matches_extensions(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// True when a listing would include the file at `path`: it lies under
    /// the root, has a counted extension, and is neither hidden nor ignored
    /// under the same rules the walker applies.
    pub fn is_listed(&self, path: &Path) -> bool {
        let cleaned = PathBuf::from(clean_path(&path.to_string_lossy()));
        let relative = match cleaned.strip_prefix(&self.root) {
            Ok(r) if !r.as_os_str().is_empty() => r,
            _ => return false,
        };
        if !self.matches_extensions(&cleaned) {
            return false;
        }
        if self.is_hidden(&cleaned) {
            return false;
        }
        !self.is_ignored(&cleaned, relative)
    }

    /// True when hidden entries are skipped and `path` has a hidden
    /// component below the root.
    pub fn is_hidden(&self, path: &Path) -> bool {
        if self.hidden {
            return false;
        }
        let cleaned = PathBuf::from(clean_path(&path.to_string_lossy()));
        cleaned.strip_prefix(&self.root)
            .is_ok_and(|relative| relative.components().any(is_hidden_component))
    }

    /// Ignore-file check for one file, deepest directory first. Precedence
    /// matches the walker: `.ignore`, then `.gitignore`, then
    /// `.git/info/exclude`, then the global excludes file. Git rules only
    /// apply inside a repository and stop at its top.
    fn is_ignored(&self, path: &Path, relative: &Path) -> bool {
        let dirs: Vec<&Path> = path.parent().map(|p| p.ancestors().collect()).unwrap_or_default();
        let any_git = !self.no_ignore && dirs.iter().any(|d| d.join(".git").exists());

        let (mut m_ignore, mut m_gi, mut m_exclude) = (None, None, None);
        let mut saw_git = false;
        for dir in &dirs {
            if m_ignore.is_none() {
                m_ignore = match_file(&dir.join(".ignore"), dir, path);
            }
            if any_git && !saw_git {
                if m_gi.is_none() {
                    m_gi = match_file(&dir.join(".gitignore"), dir, path);
                }
                if m_exclude.is_none() {
                    m_exclude = match_file(&dir.join(".git").join("info").join("exclude"), dir, path);
                }
            }
            saw_git = saw_git || dir.join(".git").exists();
        }

        let m_global = if any_git {
            let (global, _) = Gitignore::global();
            decision(global.matched_path_or_any_parents(relative, false))
        } else {
            None
        };

        m_ignore.or(m_gi).or(m_exclude).or(m_global).unwrap_or(false)
    }
}

fn is_hidden_component(c: Component<'_>) -> bool {
    matches!(c, Component::Normal(part) if part.to_string_lossy().starts_with('.'))
}

/// `Some(true)` ignored, `Some(false)` whitelisted, `None` no opinion.
fn decision<T>(m: Match<T>) -> Option<bool> {
    match m {
        Match::None => None,
        Match::Ignore(_) => Some(true),
        Match::Whitelist(_) => Some(false),
    }
}

/// Match `path` against the ignore file `file` rooted at `dir`, if it exists.
fn match_file(file: &Path, dir: &Path, path: &Path) -> Option<bool> {
    if !file.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(dir);
    if let Some(e) = builder.add(file) {
        debug!(file = %file.display(), error = %e, "Ignoring unreadable ignore file");
    }
    match builder.build() {
        Ok(gi) => decision(gi.matched_path_or_any_parents(path, false)),
        Err(e) => {
            debug!(file = %file.display(), error = %e, "Ignoring malformed ignore file");
            None
        }
    }
}

impl DocumentSource for FsSource {
    fn list_documents(&self) -> Result<Vec<DocumentId>, CacheError> {
        if !self.root.is_dir() {
            return Err(CacheError::DirNotFound(self.root.display().to_string()));
        }
        let start = Instant::now();

        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(!self.hidden);
        builder.git_ignore(!self.no_ignore);
        builder.git_global(!self.no_ignore);
        builder.git_exclude(!self.no_ignore);

        let thread_count = if self.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.threads
        };
        builder.threads(thread_count);

        let found: Mutex<Vec<DocumentId>> = Mutex::new(Vec::new());

        builder.build_parallel().run(|| {
            let found = &found;
            Box::new(move |result| {
                let entry = match result {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable entry during walk");
                        return ignore::WalkState::Continue;
                    }
                };
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    return ignore::WalkState::Continue;
                }
                if !self.matches_extensions(entry.path()) {
                    return ignore::WalkState::Continue;
                }
                if let Some(id) = self.id_for(entry.path()) {
                    found.lock().unwrap_or_else(|e| e.into_inner()).push(id);
                }
                ignore::WalkState::Continue
            })
        });

        let mut ids = found.into_inner().unwrap_or_else(|e| e.into_inner());
        ids.sort();
        debug!(
            documents = ids.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Listed documents"
        );
        Ok(ids)
    }

    fn stat(&self, id: &DocumentId) -> Result<DocStat, CacheError> {
        let meta = fs::metadata(self.path_for(id))?;
        Ok(DocStat { mtime: system_time_millis(meta.modified()?) })
    }

    fn read_content(&self, id: &DocumentId) -> Result<String, CacheError> {
        let path = self.path_for(id);
        let (content, was_lossy) = read_file_lossy(&path)?;
        if was_lossy {
            debug!(doc = %id, "Document is not valid UTF-8, counted with lossy conversion");
        }
        Ok(content)
    }

    fn exists(&self, id: &DocumentId) -> bool {
        self.path_for(id).is_file()
    }
}
