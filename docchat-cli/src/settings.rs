//! Command-line flags, their environment fallbacks, and the backends they
//! select.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use docchat_rag::{
    EmbeddingGateway, EmbeddingProvider, HashEmbeddingProvider, LlmGateway, OpenAIChatModel,
    OpenAIEmbeddingProvider, RagConfig,
};
use tracing::info;

/// Chat with your documentation.
#[derive(Debug, Parser)]
#[command(name = "docchat", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "DOCCHAT_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the index from the documentation directory and save it.
    Build,
    /// Chat in the terminal.
    Chat {
        /// Rebuild the index before chatting, even if one exists.
        #[arg(long)]
        rebuild: bool,
    },
    /// Serve the chat over HTTP.
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// OpenAI-compatible embeddings API.
    Openai,
    /// Offline feature-hashing embeddings.
    Hash,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Directory holding the markdown documentation.
    #[arg(long, global = true, env = "DOCCHAT_DOCS_PATH", default_value = "docs")]
    pub docs_path: PathBuf,

    /// Directory the index is saved to and loaded from.
    #[arg(long, global = true, env = "DOCCHAT_INDEX_PATH", default_value = "docchat_index")]
    pub index_path: PathBuf,

    /// Embedding backend. Defaults to `openai` when an API key is set,
    /// `hash` otherwise.
    #[arg(long, global = true, env = "DOCCHAT_EMBEDDING_BACKEND", value_enum)]
    pub embedding_backend: Option<EmbeddingBackend>,

    /// Embedding model name.
    #[arg(long, global = true, env = "DOCCHAT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Embedding dimension override.
    #[arg(long, global = true, env = "DOCCHAT_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API, e.g. OpenRouter.
    #[arg(long, global = true, env = "OPENAI_API_BASE")]
    pub openai_api_base: Option<String>,

    /// Chat model name.
    #[arg(long, global = true, env = "DOCCHAT_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature of the chat model.
    #[arg(long, global = true, env = "DOCCHAT_TEMPERATURE")]
    pub temperature: Option<f32>,

    /// `HTTP-Referer` sent to routed APIs.
    #[arg(long, global = true, env = "DOCCHAT_APP_URL")]
    pub app_url: Option<String>,

    /// `X-Title` sent to routed APIs.
    #[arg(long, global = true, env = "DOCCHAT_APP_TITLE", default_value = "docchat")]
    pub app_title: String,

    #[arg(long, global = true, env = "DOCCHAT_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    #[arg(long, global = true, env = "DOCCHAT_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question.
    #[arg(long, global = true, env = "DOCCHAT_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Past turns shown to the question condenser.
    #[arg(long, global = true, env = "DOCCHAT_HISTORY_TURNS", default_value_t = 10)]
    pub history_turns: usize,

    /// Deadline for each embedding or model call, in seconds.
    #[arg(long, global = true, env = "DOCCHAT_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    #[arg(long, global = true, env = "DOCCHAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, global = true, env = "DOCCHAT_PORT", default_value_t = 7860)]
    pub port: u16,
}

impl Settings {
    /// Tuning parameters for the build and query phases.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .history_turns(self.history_turns)
            .gateway_timeout_secs(self.timeout_secs)
            .build()
            .context("invalid configuration")
    }

    fn api_key(&self) -> Option<&str> {
        self.openai_api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// The embedding backend in effect.
    pub fn embedding_backend(&self) -> EmbeddingBackend {
        self.embedding_backend.unwrap_or(if self.api_key().is_some() {
            EmbeddingBackend::Openai
        } else {
            EmbeddingBackend::Hash
        })
    }

    /// Construct the process-wide embedding gateway.
    pub fn embedding_gateway(&self, config: &RagConfig) -> Result<EmbeddingGateway> {
        let provider: Arc<dyn EmbeddingProvider> = match self.embedding_backend() {
            EmbeddingBackend::Openai => {
                let mut provider = OpenAIEmbeddingProvider::new(self.api_key().unwrap_or_default())?;
                if let Some(base) = &self.openai_api_base {
                    provider = provider.with_base_url(base.as_str());
                }
                if let Some(model) = &self.embedding_model {
                    provider = provider.with_model(model.as_str());
                }
                if let Some(dims) = self.embedding_dimensions {
                    provider = provider.with_dimensions(dims);
                }
                Arc::new(provider)
            }
            EmbeddingBackend::Hash => Arc::new(match self.embedding_dimensions {
                Some(dims) => HashEmbeddingProvider::new(dims)?,
                None => HashEmbeddingProvider::default(),
            }),
        };

        let gateway = EmbeddingGateway::from_config(provider, config);
        gateway.ensure_available()?;
        info!(
            model = gateway.model_id(),
            dimensions = gateway.dimensions(),
            "embedding backend ready"
        );
        Ok(gateway)
    }

    /// Construct the chat model selected by these settings.
    pub fn chat_model(&self, config: &RagConfig) -> Result<OpenAIChatModel> {
        let Some(api_key) = self.api_key() else {
            bail!("OPENAI_API_KEY is not set; add it to your environment or .env file");
        };

        let mut model =
            OpenAIChatModel::new(api_key)?.with_request_timeout(config.gateway_timeout())?;
        if let Some(base) = &self.openai_api_base {
            model = model.with_base_url(base.as_str());
        }
        if let Some(name) = &self.model {
            model = model.with_model(name.as_str());
        }
        if let Some(temperature) = self.temperature {
            model = model.with_temperature(temperature);
        }
        if model.is_routed() {
            model = model.with_header("X-Title", &self.app_title)?;
            if let Some(url) = &self.app_url {
                model = model.with_header("HTTP-Referer", url)?;
            }
        }

        Ok(model)
    }

    /// Construct the language model gateway.
    pub fn llm_gateway(&self, config: &RagConfig) -> Result<LlmGateway> {
        Ok(LlmGateway::from_config(Arc::new(self.chat_model(config)?), config))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("docchat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_after_subcommand_are_accepted() {
        let cli = parse(&[
            "chat",
            "--rebuild",
            "--docs-path",
            "manual",
            "--top-k",
            "3",
            "--embedding-backend",
            "hash",
        ]);
        assert!(matches!(cli.command, Command::Chat { rebuild: true }));
        assert_eq!(cli.settings.docs_path, PathBuf::from("manual"));
        assert_eq!(cli.settings.top_k, 3);
        assert_eq!(cli.settings.embedding_backend(), EmbeddingBackend::Hash);
    }

    #[test]
    fn hash_backend_honours_dimension_override() {
        let cli = parse(&["build", "--embedding-backend", "hash", "--embedding-dimensions", "64"]);
        let config = cli.settings.rag_config().unwrap();
        let gateway = cli.settings.embedding_gateway(&config).unwrap();
        assert_eq!(gateway.dimensions(), 64);
        assert_eq!(gateway.model_id(), "hash-64");
    }

    #[test]
    fn invalid_chunking_is_rejected() {
        let cli = parse(&["build", "--chunk-size", "100", "--chunk-overlap", "100"]);
        assert!(cli.settings.rag_config().is_err());
    }

    #[test]
    fn chat_model_needs_a_key() {
        let mut cli = parse(&["serve", "--embedding-backend", "hash"]);
        cli.settings.openai_api_key = None;
        let config = cli.settings.rag_config().unwrap();
        assert!(cli.settings.llm_gateway(&config).is_err());
    }

    #[test]
    fn chat_model_uses_the_gateway_timeout() {
        let mut cli = parse(&["serve", "--timeout-secs", "15", "--model", "gpt-4o"]);
        cli.settings.openai_api_key = Some("sk-test".to_string());
        cli.settings.openai_api_base = None;
        let config = cli.settings.rag_config().unwrap();

        let model = cli.settings.chat_model(&config).unwrap();
        assert_eq!(model.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(cli.settings.llm_gateway(&config).unwrap().name(), "gpt-4o");
    }
}
