//! Embedding provider trait and the gateway that wraps it.
//!
//! [`EmbeddingProvider`] is the capability implemented by each backend.
//! [`EmbeddingGateway`] is what the rest of the crate talks to: it adds
//! deadlines, batching, bounded concurrency and output validation on top of a
//! single provider instance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends that
/// support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Identifier of the embedding model, recorded in persisted indexes.
    fn model_id(&self) -> &str;
}

/// The process-wide entry point for embeddings.
///
/// Cloning is cheap; clones share the same provider.
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    batch_size: usize,
    concurrency: usize,
}

impl std::fmt::Debug for EmbeddingGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGateway")
            .field("model_id", &self.provider.model_id())
            .field("dimensions", &self.provider.dimensions())
            .field("timeout", &self.timeout)
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl EmbeddingGateway {
    /// Wrap a provider with the default limits from [`RagConfig::default`].
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::from_config(provider, &RagConfig::default())
    }

    /// Wrap a provider using the limits in `config`.
    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &RagConfig) -> Self {
        Self {
            provider,
            timeout: config.gateway_timeout(),
            batch_size: config.embed_batch_size.max(1),
            concurrency: config.embed_concurrency.max(1),
        }
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of texts per backend request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the number of backend requests in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Dimensionality of the vectors this gateway produces.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Identifier of the underlying embedding model.
    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    /// Check that the backend is usable before any other pipeline step runs.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingBackendUnavailable`] if the provider
    /// reports no usable output dimension.
    pub fn ensure_available(&self) -> Result<()> {
        if self.provider.dimensions() == 0 {
            return Err(RagError::EmbeddingBackendUnavailable {
                provider: self.provider.model_id().to_string(),
                message: "provider reports zero output dimensions".to_string(),
            });
        }
        Ok(())
    }

    /// Embed `texts`, returning one vector per input in input order.
    ///
    /// Inputs are split into batches that are sent concurrently.
    ///
    /// # Errors
    ///
    /// - [`RagError::GatewayTimeout`] if a batch exceeds the deadline
    /// - [`RagError::DimensionMismatch`] if the backend returns vectors of the
    ///   wrong size
    /// - [`RagError::EmbeddingError`] if the backend fails or returns the wrong
    ///   number of vectors
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| self.embed_batch(batch))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        info!(
            model = self.provider.model_id(),
            text_count = texts.len(),
            batch_size = self.batch_size,
            "embedded texts"
        );
        Ok(vectors)
    }

    /// Embed a single query text.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text]).await?;
        vectors.pop().ok_or_else(|| RagError::EmbeddingError {
            provider: self.provider.model_id().to_string(),
            message: "backend returned no vector for the query".to_string(),
        })
    }

    async fn embed_batch(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
        debug!(model = self.provider.model_id(), batch_size = batch.len(), "embedding batch");

        let vectors = tokio::time::timeout(self.timeout, self.provider.embed_batch(batch))
            .await
            .map_err(|_| {
                error!(model = self.provider.model_id(), timeout = ?self.timeout, "embedding timed out");
                RagError::GatewayTimeout { gateway: "embedding".to_string(), timeout: self.timeout }
            })??;

        if vectors.len() != batch.len() {
            return Err(RagError::EmbeddingError {
                provider: self.provider.model_id().to_string(),
                message: format!("expected {} vectors, backend returned {}", batch.len(), vectors.len()),
            });
        }

        let expected = self.provider.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(RagError::DimensionMismatch { expected, actual: bad.len() });
        }

        Ok(vectors)
    }
}
