//! Data types for documents, chunks, index entries and search results.

use serde::{Deserialize, Serialize};

/// A source document read from the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable identifier: the path relative to the corpus root, `/`-separated.
    pub source_id: String,
    /// The full text of the document.
    pub raw_text: String,
    /// Optional URI pointing to the original file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no source URI.
    pub fn new(source_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), raw_text: raw_text.into(), source_uri: None }
    }
}

/// A contiguous segment of a [`Document`]'s text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Identifier of the form `{source_id}_{sequence_index}`.
    pub id: String,
    /// The `source_id` of the parent [`Document`].
    pub source_id: String,
    /// The text of the chunk.
    pub text: String,
    /// Position of the chunk within its document, starting at zero.
    pub sequence_index: usize,
    /// Byte offset of `text` within the parent document's `raw_text`.
    pub offset: usize,
}

impl Chunk {
    /// Byte offset one past the end of this chunk in the parent document.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// A [`Chunk`] paired with its embedding, as stored by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The embedding of `chunk.text`.
    pub vector: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}
