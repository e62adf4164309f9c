//! Query-time retrieval: embed the query, search the index.

use std::sync::Arc;

use tracing::{debug, info};

use crate::document::SearchResult;
use crate::embedding::EmbeddingGateway;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embeds query text and searches a shared, read-only [`VectorIndex`].
#[derive(Debug, Clone)]
pub struct Retriever {
    embeddings: EmbeddingGateway,
    index: Arc<VectorIndex>,
}

impl Retriever {
    /// Pair an embedding gateway with an index built by the same backend.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the gateway's dimension
    /// differs from the index's.
    pub fn new(embeddings: EmbeddingGateway, index: Arc<VectorIndex>) -> Result<Self> {
        if embeddings.dimensions() != index.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: index.dimension(),
                actual: embeddings.dimensions(),
            });
        }
        Ok(Self { embeddings, index })
    }

    /// The index being searched.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// An empty index yields no results without calling the embedding backend.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.index.is_empty() {
            debug!("index is empty, skipping retrieval");
            return Ok(Vec::new());
        }

        let query_vector = self.embeddings.embed_query(query).await?;
        let results = self.index.search(&query_vector, k)?;

        info!(
            result_count = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved chunks"
        );
        Ok(results)
    }
}
