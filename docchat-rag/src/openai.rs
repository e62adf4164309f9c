//! OpenAI-compatible embedding and chat backends.
//!
//! Both talk to an OpenAI-style REST API over `reqwest`. Pointing the base URL
//! at OpenRouter (or any compatible gateway) switches the default model names
//! to the provider-prefixed form that gateway expects.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::Llm;

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const ROUTED_EMBEDDING_MODEL: &str = "openai/text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;

const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const ROUTED_CHAT_MODEL: &str = "anthropic/claude-3.5-sonnet";
const DEFAULT_TEMPERATURE: f32 = 0.7;

fn is_default_base(base_url: &str) -> bool {
    base_url.trim_end_matches('/') == OPENAI_API_BASE
}

fn api_key_from_env(provider: &str) -> Result<String> {
    std::env::var("OPENAI_API_KEY").map_err(|_| RagError::EmbeddingBackendUnavailable {
        provider: provider.into(),
        message: "OPENAI_API_KEY environment variable not set".into(),
    })
}

fn base_from_env() -> String {
    std::env::var("OPENAI_API_BASE")
        .ok()
        .filter(|base| !base.trim().is_empty())
        .unwrap_or_else(|| OPENAI_API_BASE.to_string())
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the API's error message out of a failed response body.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible `/embeddings`
/// endpoint.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`, or
///   `openai/text-embedding-3-small` behind a custom base URL.
/// - `dimensions` – optional Matryoshka dimension override.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment variable.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// If set, passed to the API for Matryoshka dimension truncation.
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key against the OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingBackendUnavailable`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::EmbeddingBackendUnavailable {
                provider: "OpenAI".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a provider from `OPENAI_API_KEY` and, if set, `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(api_key_from_env("OpenAI")?)?.with_base_url(base_from_env()))
    }

    /// Point the provider at another OpenAI-compatible API.
    ///
    /// A non-default base URL switches the default model to its
    /// provider-prefixed name; call [`with_model`](Self::with_model)
    /// afterwards to override it.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        if !is_default_base(&self.base_url) && self.model == DEFAULT_EMBEDDING_MODEL {
            self.model = ROUTED_EMBEDDING_MODEL.into();
        }
        self
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka support).
    ///
    /// This also updates the value returned by
    /// [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn failure(&self, message: String) -> RagError {
        RagError::EmbeddingError { provider: "OpenAI".into(), message }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.failure("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "OpenAI", batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                self.failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let message = error_detail(response).await;
            error!(provider = "OpenAI", %message, "API error");
            return Err(self.failure(message));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {e}"))
        })?;

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// An [`Llm`] backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// ```rust,ignore
/// use docchat_rag::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::from_env()?.with_temperature(0.2);
/// let reply = model.generate("Say hello").await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    headers: HeaderMap,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAIChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl OpenAIChatModel {
    /// Create a chat model with the given API key against the OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("OpenAI API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_API_BASE.into(),
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            headers: HeaderMap::new(),
            request_timeout: None,
        })
    }

    /// Create a chat model from `OPENAI_API_KEY` and, if set, `OPENAI_API_BASE`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::ConfigError("OPENAI_API_KEY environment variable not set".into()))?;
        Ok(Self::new(api_key)?.with_base_url(base_from_env()))
    }

    /// Point the model at another OpenAI-compatible API.
    ///
    /// A non-default base URL switches the default model to
    /// `anthropic/claude-3.5-sonnet`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        if !is_default_base(&self.base_url) && self.model == DEFAULT_CHAT_MODEL {
            self.model = ROUTED_CHAT_MODEL.into();
        }
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Send an extra header with every request (e.g. `HTTP-Referer`).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the name or value is not a valid
    /// HTTP header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RagError::ConfigError(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RagError::ConfigError(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Whether requests go to a gateway other than the OpenAI API.
    pub fn is_routed(&self) -> bool {
        !is_default_base(&self.base_url)
    }

    /// Build a client whose requests time out after `timeout`.
    ///
    /// The [`LlmGateway`](crate::LlmGateway) deadline still applies on top.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        self.request_timeout = Some(timeout);
        Ok(self)
    }

    /// The HTTP request timeout, if one was set.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    fn failure(&self, message: String) -> RagError {
        RagError::GenerationFailed { model: self.model.clone(), message }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Llm for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "chat completion request");

        let request_body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .headers(self.headers.clone())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(self.failure(error_detail(response).await));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| self.failure("response contained no message content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_unavailable() {
        let err = OpenAIEmbeddingProvider::new("  ").err().unwrap();
        assert!(matches!(err, RagError::EmbeddingBackendUnavailable { .. }));
    }

    #[test]
    fn routed_base_switches_default_models() {
        let embeddings =
            OpenAIEmbeddingProvider::new("key").unwrap().with_base_url("https://openrouter.ai/api/v1/");
        assert_eq!(embeddings.model_id(), "openai/text-embedding-3-small");
        assert_eq!(embeddings.dimensions(), 1536);

        let chat = OpenAIChatModel::new("key").unwrap().with_base_url("https://openrouter.ai/api/v1");
        assert_eq!(chat.name(), "anthropic/claude-3.5-sonnet");
        assert!(chat.is_routed());
    }

    #[test]
    fn explicit_model_survives_base_url_change() {
        let chat = OpenAIChatModel::new("key")
            .unwrap()
            .with_model("meta-llama/llama-3.1-70b-instruct")
            .with_base_url("https://openrouter.ai/api/v1");
        assert_eq!(chat.name(), "meta-llama/llama-3.1-70b-instruct");
    }

    #[test]
    fn default_base_keeps_openai_models() {
        let chat = OpenAIChatModel::new("key").unwrap().with_base_url(OPENAI_API_BASE);
        assert_eq!(chat.name(), "gpt-4o-mini");
        assert!(!chat.is_routed());
    }

    #[test]
    fn request_timeout_is_recorded() {
        let chat = OpenAIChatModel::new("key").unwrap();
        assert_eq!(chat.request_timeout(), None);
        let chat = chat.with_request_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(chat.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_invalid_header() {
        let err = OpenAIChatModel::new("key").unwrap().with_header("bad header", "x").unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn dimension_override_is_reported() {
        let provider = OpenAIEmbeddingProvider::new("key").unwrap().with_dimensions(256);
        assert_eq!(provider.dimensions(), 256);
    }
}
