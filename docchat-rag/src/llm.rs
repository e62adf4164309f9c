//! Language model capability and its gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// A text-in, text-out language model backend.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::Llm;
///
/// let answer = model.generate("Say hello").await?;
/// ```
#[async_trait]
pub trait Llm: Send + Sync {
    /// Model identifier, used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Wraps an [`Llm`] with a deadline and uniform error mapping.
#[derive(Clone)]
pub struct LlmGateway {
    llm: Arc<dyn Llm>,
    timeout: Duration,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("model", &self.llm.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmGateway {
    /// Wrap a model with the default deadline.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self::from_config(llm, &RagConfig::default())
    }

    /// Wrap a model with the deadline from `config`.
    pub fn from_config(llm: Arc<dyn Llm>, config: &RagConfig) -> Self {
        Self { llm, timeout: config.gateway_timeout() }
    }

    /// Set the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The wrapped model's name.
    pub fn name(&self) -> &str {
        self.llm.name()
    }

    /// Call the model.
    ///
    /// # Errors
    ///
    /// - [`RagError::GatewayTimeout`] if the call exceeds the deadline
    /// - [`RagError::GenerationFailed`] for any backend failure
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = self.llm.name(), prompt_len = prompt.len(), "calling language model");

        let outcome = tokio::time::timeout(self.timeout, self.llm.generate(prompt)).await.map_err(
            |_| {
                error!(model = self.llm.name(), timeout = ?self.timeout, "language model timed out");
                RagError::GatewayTimeout { gateway: "llm".to_string(), timeout: self.timeout }
            },
        )?;

        outcome.map_err(|e| {
            error!(model = self.llm.name(), error = %e, "language model call failed");
            match e {
                RagError::GatewayTimeout { .. } | RagError::GenerationFailed { .. } => e,
                other => RagError::GenerationFailed {
                    model: self.llm.name().to_string(),
                    message: other.to_string(),
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Llm for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(RagError::ConfigError("bad request".to_string()))
        }
    }

    struct Stalled;

    #[async_trait]
    impl Llm for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn backend_errors_become_generation_failed() {
        let err = LlmGateway::new(Arc::new(Failing)).generate("hi").await.unwrap_err();
        assert!(matches!(err, RagError::GenerationFailed { ref model, .. } if model == "failing"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_times_out() {
        let gateway = LlmGateway::new(Arc::new(Stalled)).with_timeout(Duration::from_secs(5));
        let err = gateway.generate("hi").await.unwrap_err();
        assert!(matches!(err, RagError::GatewayTimeout { ref gateway, .. } if gateway == "llm"));
    }
}
