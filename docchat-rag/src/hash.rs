//! Offline embedding provider based on feature hashing.
//!
//! [`HashEmbeddingProvider`] needs no credentials or network access. Each
//! lower-cased alphanumeric token is hashed into one signed bucket of the
//! output vector, which is then L2-normalised. Texts sharing vocabulary get a
//! positive cosine similarity, which is enough for small corpora, demos and
//! tests.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default output dimension, matching common small sentence encoders.
pub const DEFAULT_HASH_DIMENSIONS: usize = 384;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// A deterministic bag-of-words embedding provider.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::HashEmbeddingProvider;
///
/// let provider = HashEmbeddingProvider::new(384)?;
/// let embedding = provider.embed("set API key and secret").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
    model_id: String,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of `dimensions` floats.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingBackendUnavailable`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::EmbeddingBackendUnavailable {
                provider: "Hash".into(),
                message: "dimensions must be greater than zero".into(),
            });
        }
        Ok(Self { dimensions, model_id: format!("hash-{dimensions}") })
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_HASH_DIMENSIONS,
            model_id: format!("hash-{DEFAULT_HASH_DIMENSIONS}"),
        }
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn vectors_are_normalized_and_deterministic() {
        let provider = HashEmbeddingProvider::new(64).unwrap();
        let a = provider.embed("Connect to Binance").await.unwrap();
        let b = provider.embed("connect TO binance").await.unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!((dot(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let provider = HashEmbeddingProvider::default();
        let doc = provider.embed("To connect to Binance, set API key and secret.").await.unwrap();
        let related = provider.embed("how do I connect to Binance?").await.unwrap();
        let unrelated = provider.embed("pure market making spreads").await.unwrap();
        assert!(dot(&doc, &related) > dot(&doc, &unrelated));
    }

    #[tokio::test]
    async fn text_without_tokens_is_zero_vector() {
        let provider = HashEmbeddingProvider::new(8).unwrap();
        let v = provider.embed("  ?! ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dimensions_is_rejected() {
        assert!(matches!(
            HashEmbeddingProvider::new(0),
            Err(RagError::EmbeddingBackendUnavailable { .. })
        ));
    }
}
