//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docchat_rag::embedding::EmbeddingProvider;
use docchat_rag::error::{RagError, Result};
use docchat_rag::hash::HashEmbeddingProvider;
use docchat_rag::llm::Llm;

/// A language model that replays scripted replies and records every prompt.
///
/// Once the script runs out it answers `"no more replies"`.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, text: &str) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        Arc::clone(self)
    }

    pub fn fail(self: &Arc<Self>, message: &str) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Err(RagError::GenerationFailed {
            model: "scripted".to_string(),
            message: message.to_string(),
        }));
        Arc::clone(self)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok("no more replies".to_string()))
    }
}

/// Hash embeddings that record every text they are asked to embed.
pub struct RecordingEmbedder {
    inner: HashEmbeddingProvider,
    texts: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    pub fn new(dimensions: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: HashEmbeddingProvider::new(dimensions).unwrap(),
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.texts.lock().unwrap().clear();
    }
}

#[async_trait]
impl EmbeddingProvider for RecordingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().unwrap().push(text.to_string());
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.texts.lock().unwrap().extend(texts.iter().map(|t| t.to_string()));
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

/// A language model that never answers prompts containing `marker` and
/// replies `"answered"` to everything else.
pub struct StallingLlm {
    marker: &'static str,
}

impl StallingLlm {
    pub fn on(marker: &'static str) -> Self {
        Self { marker }
    }
}

#[async_trait]
impl Llm for StallingLlm {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.contains(self.marker) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok("answered".to_string())
    }
}
