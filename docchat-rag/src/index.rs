//! Exact nearest-neighbour index over chunk embeddings.
//!
//! [`VectorIndex`] is built once from a complete set of [`IndexEntry`] values
//! and is read-only afterwards, so it can be shared across sessions behind an
//! `Arc`. Similarity is cosine similarity; the metric name is written into the
//! persisted file and checked on load.
//!
//! The on-disk form is a single JSON document, `index.json`, inside the index
//! directory:
//!
//! ```json
//! { "format": "docchat-index", "version": 1, "metric": "cosine",
//!   "model_id": "text-embedding-3-small", "dimension": 1536,
//!   "entry_count": 2, "entries": [ { "chunk": { ... }, "vector": [ ... ] } ] }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::{IndexEntry, SearchResult};
use crate::error::{RagError, Result};

/// File name of the persisted index inside its directory.
pub const INDEX_FILE_NAME: &str = "index.json";

const FORMAT_NAME: &str = "docchat-index";
const FORMAT_VERSION: u32 = 1;
const METRIC: &str = "cosine";

/// An immutable, brute-force cosine-similarity index.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::VectorIndex;
///
/// let index = VectorIndex::build("hash-384", 384, entries)?;
/// index.save("docchat_index")?;
/// let index = VectorIndex::load("docchat_index", 384)?;
/// let results = index.search(&query, 5)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model_id: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Serialize)]
struct PersistedIndexRef<'a> {
    format: &'a str,
    version: u32,
    metric: &'a str,
    model_id: &'a str,
    dimension: usize,
    entry_count: usize,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct PersistedIndex {
    format: String,
    version: u32,
    metric: String,
    model_id: String,
    dimension: usize,
    entry_count: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from a complete set of entries.
    ///
    /// `dimension` is the output dimension of the embedding backend that
    /// produced the vectors.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpus`] if `entries` is empty
    /// - [`RagError::DimensionMismatch`] if any vector's length differs from
    ///   `dimension`
    pub fn build(
        model_id: impl Into<String>,
        dimension: usize,
        entries: Vec<IndexEntry>,
    ) -> Result<Self> {
        if entries.is_empty() {
            return Err(RagError::EmptyCorpus("no entries to index".to_string()));
        }
        if let Some(bad) = entries.iter().find(|entry| entry.vector.len() != dimension) {
            return Err(RagError::DimensionMismatch { expected: dimension, actual: bad.vector.len() });
        }

        let index = Self { model_id: model_id.into(), dimension, entries };
        info!(model = %index.model_id, dimension, entry_count = index.len(), "built vector index");
        Ok(index)
    }

    /// An index with no entries. Searching it always returns no results.
    pub fn empty(model_id: impl Into<String>, dimension: usize) -> Self {
        Self { model_id: model_id.into(), dimension, entries: Vec::new() }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimension of every entry.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Identifier of the embedding model the index was built with.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// The stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. Returns fewer than `k` results when
    /// the index is smaller, and no results when it is empty.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if `query` has the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&entry.vector, query)))
            .collect();

        // `sort_by` is stable, so ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { chunk: self.entries[i].chunk.clone(), score })
            .collect())
    }

    /// Persist the index into directory `dir`, creating it if needed.
    ///
    /// The file is written to a temporary name and renamed into place, so a
    /// failed save never leaves a truncated index behind.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let persisted = PersistedIndexRef {
            format: FORMAT_NAME,
            version: FORMAT_VERSION,
            metric: METRIC,
            model_id: &self.model_id,
            dimension: self.dimension,
            entry_count: self.entries.len(),
            entries: &self.entries,
        };
        let json = serde_json::to_vec(&persisted).map_err(std::io::Error::other)?;

        let target = dir.join(INDEX_FILE_NAME);
        let temp = dir.join(format!("{INDEX_FILE_NAME}.tmp"));
        fs::write(&temp, json)?;
        fs::rename(&temp, &target)?;

        info!(path = %target.display(), entry_count = self.len(), "saved vector index");
        Ok(())
    }

    /// Load an index saved by [`save`](VectorIndex::save).
    ///
    /// `expected_dimension` is the output dimension of the currently
    /// configured embedding backend.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexCorrupt`] if the file is missing or structurally
    ///   invalid
    /// - [`RagError::DimensionMismatch`] if the index was built with a
    ///   different dimension
    pub fn load(dir: impl AsRef<Path>, expected_dimension: usize) -> Result<Self> {
        let path = dir.as_ref().join(INDEX_FILE_NAME);
        let corrupt = |message: String| RagError::IndexCorrupt { path: path.clone(), message };

        let bytes = fs::read(&path).map_err(|e| corrupt(format!("cannot read index: {e}")))?;
        let persisted: PersistedIndex =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(format!("invalid index: {e}")))?;

        if persisted.format != FORMAT_NAME {
            return Err(corrupt(format!("unknown format '{}'", persisted.format)));
        }
        if persisted.version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported version {}", persisted.version)));
        }
        if persisted.metric != METRIC {
            return Err(corrupt(format!("unsupported metric '{}'", persisted.metric)));
        }
        if persisted.entry_count != persisted.entries.len() {
            return Err(corrupt(format!(
                "header declares {} entries, found {}",
                persisted.entry_count,
                persisted.entries.len()
            )));
        }
        if let Some(bad) = persisted.entries.iter().find(|e| e.vector.len() != persisted.dimension) {
            return Err(corrupt(format!(
                "entry '{}' has {} dimensions, header declares {}",
                bad.chunk.id,
                bad.vector.len(),
                persisted.dimension
            )));
        }
        if persisted.dimension != expected_dimension {
            return Err(RagError::DimensionMismatch {
                expected: expected_dimension,
                actual: persisted.dimension,
            });
        }

        info!(
            path = %path.display(),
            model = %persisted.model_id,
            entry_count = persisted.entry_count,
            "loaded vector index"
        );
        Ok(Self {
            model_id: persisted.model_id,
            dimension: persisted.dimension,
            entries: persisted.entries,
        })
    }

    /// Like [`load`](VectorIndex::load), also warning when the index was
    /// built by a different model of the same dimension.
    pub fn load_for_model(
        dir: impl AsRef<Path>,
        model_id: &str,
        expected_dimension: usize,
    ) -> Result<Self> {
        let index = Self::load(dir, expected_dimension)?;
        if index.model_id != model_id {
            warn!(
                index_model = %index.model_id,
                configured_model = model_id,
                "index was built with a different embedding model"
            );
        }
        Ok(index)
    }

    /// Path of the index file inside `dir`.
    pub fn file_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(INDEX_FILE_NAME)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
