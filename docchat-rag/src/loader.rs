//! Corpus discovery and loading.
//!
//! [`CorpusLoader`] walks a directory tree and yields one [`Document`] per
//! file whose extension matches the filter. Files that cannot be read as
//! UTF-8 text are skipped with a warning instead of failing the whole load.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Reads a documentation tree into [`Document`]s.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::CorpusLoader;
///
/// let documents = CorpusLoader::new("docs").load_all()?;
/// ```
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    root: PathBuf,
    extensions: Vec<String>,
}

/// A file that was skipped during loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// The file that could not be loaded.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

impl CorpusLoader {
    /// Create a loader for markdown (`.md`) files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), extensions: vec!["md".to_string()] }
    }

    /// Replace the extension filter. Extensions are compared case-insensitively
    /// and may be given with or without a leading dot.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// The corpus root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List matching files under the root, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorpusNotFound`] if the root does not exist or is
    /// not a directory.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            return Err(RagError::CorpusNotFound {
                path: self.root.clone(),
                reason: "path does not exist".to_string(),
            });
        }
        if !self.root.is_dir() {
            return Err(RagError::CorpusNotFound {
                path: self.root.clone(),
                reason: "path is not a directory".to_string(),
            });
        }

        let mut files = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable corpus entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| self.matches(entry.path()))
            .map(|entry| entry.into_path())
            .collect::<Vec<_>>();

        files.sort();
        debug!(root = %self.root.display(), file_count = files.len(), "discovered corpus files");
        Ok(files)
    }

    /// Lazily load every matching file.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorpusNotFound`] if the root is missing or holds no
    /// matching files.
    pub fn load(&self) -> Result<Documents> {
        let paths = self.discover()?;
        if paths.is_empty() {
            return Err(RagError::CorpusNotFound {
                path: self.root.clone(),
                reason: format!("no files with extension {}", self.extensions.join(", ")),
            });
        }
        Ok(self.documents(paths))
    }

    /// Load every matching file eagerly.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorpusNotFound`] if the root is missing or no file
    /// could be loaded.
    pub fn load_all(&self) -> Result<Vec<Document>> {
        let documents: Vec<Document> = self.load()?.collect();
        if documents.is_empty() {
            return Err(RagError::CorpusNotFound {
                path: self.root.clone(),
                reason: "every matching file failed to load".to_string(),
            });
        }
        Ok(documents)
    }

    /// Build a lazy document iterator over already discovered paths.
    pub fn documents(&self, paths: Vec<PathBuf>) -> Documents {
        Documents { root: self.root.clone(), paths: paths.into_iter(), skipped: Vec::new() }
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)))
    }
}

/// Lazy iterator over the documents of a corpus.
///
/// Files are read one at a time as the iterator advances.
#[derive(Debug)]
pub struct Documents {
    root: PathBuf,
    paths: std::vec::IntoIter<PathBuf>,
    skipped: Vec<SkippedFile>,
}

impl Documents {
    /// Files skipped so far.
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }
}

fn read_document(root: &Path, path: &Path) -> std::result::Result<Document, String> {
    let raw_text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    Ok(Document {
        source_id: source_id(root, path),
        raw_text,
        source_uri: Some(path.display().to_string()),
    })
}

impl Iterator for Documents {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        while let Some(path) = self.paths.next() {
            match read_document(&self.root, &path) {
                Ok(document) => return Some(document),
                Err(reason) => {
                    warn!(path = %path.display(), %reason, "skipping corpus file");
                    self.skipped.push(SkippedFile { path, reason });
                }
            }
        }
        None
    }
}

/// Relative, `/`-separated path of `path` under `root`.
fn source_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
