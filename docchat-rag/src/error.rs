//! Error types for the `docchat-rag` crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building an index or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// The corpus root does not exist, is not a directory, or holds no
    /// matching documents.
    #[error("Corpus not found at {}: {reason}", path.display())]
    CorpusNotFound {
        /// The corpus root that was requested.
        path: PathBuf,
        /// Why the corpus could not be used.
        reason: String,
    },

    /// The embedding backend is missing credentials or configuration.
    #[error("Embedding backend unavailable ({provider}): {message}")]
    EmbeddingBackendUnavailable {
        /// The embedding provider that could not be constructed.
        provider: String,
        /// A description of the missing configuration.
        message: String,
    },

    /// An embedding backend call failed after the backend was configured.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Vectors of different dimensions were mixed.
    #[error("Dimension mismatch: expected {expected}, found {actual}")]
    DimensionMismatch {
        /// The dimension required by the index or backend.
        expected: usize,
        /// The dimension that was actually seen.
        actual: usize,
    },

    /// The build phase produced nothing to index.
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// A persisted index is structurally invalid.
    #[error("Index corrupt at {}: {message}", path.display())]
    IndexCorrupt {
        /// The index location that failed to load.
        path: PathBuf,
        /// A description of the problem.
        message: String,
    },

    /// A gateway call did not finish within its deadline.
    #[error("Gateway timeout ({gateway}) after {timeout:?}")]
    GatewayTimeout {
        /// The gateway that timed out (`embedding` or `llm`).
        gateway: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// The language model failed to produce an answer.
    #[error("Generation failed ({model}): {message}")]
    GenerationFailed {
        /// The model that was called.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The session was shut down and cannot answer further questions.
    #[error("Session is closed")]
    SessionClosed,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error outside of corpus loading (which skips bad files).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
