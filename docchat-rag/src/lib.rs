//! Retrieval-augmented question answering over a documentation corpus.
//!
//! The crate has two phases:
//!
//! - **Build**: [`IndexBuilder`] loads a directory of markdown files with
//!   [`CorpusLoader`], splits them with a [`Chunker`], embeds every chunk
//!   through an [`EmbeddingGateway`] and persists a [`VectorIndex`].
//! - **Query**: an [`AnsweringSession`] condenses each follow-up question
//!   against its [`ConversationMemory`], retrieves the most similar chunks
//!   with a [`Retriever`] and asks an [`Llm`] for a grounded answer.
//!
//! Backends are plugged in once, at construction, as trait objects:
//! [`EmbeddingProvider`] for embeddings and [`Llm`] for generation. The
//! `openai` feature (on by default) provides OpenAI-compatible
//! implementations of both; [`HashEmbeddingProvider`] works offline.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_rag::*;
//!
//! let config = RagConfig::default();
//! let embeddings = EmbeddingGateway::from_config(Arc::new(HashEmbeddingProvider::default()), &config);
//! let report = IndexBuilder::new(embeddings.clone(), config.clone())?
//!     .build_and_save("docs", "docchat_index")
//!     .await?;
//!
//! let index = VectorIndex::load("docchat_index", embeddings.dimensions())?;
//! let mut session = AnsweringSession::builder()
//!     .config(config)
//!     .index(Arc::new(index))
//!     .embeddings(embeddings)
//!     .llm(llm)
//!     .build()?;
//! let answer = session.ask("How do I connect to Binance?").await?;
//! ```

pub mod builder;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hash;
pub mod index;
pub mod llm;
pub mod loader;
pub mod memory;
pub mod prompt;
pub mod retriever;
pub mod session;

#[cfg(feature = "openai")]
pub mod openai;

pub use builder::{BuildReport, IndexBuilder};
pub use chunking::{Chunker, RecursiveChunker, reconstruct};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, IndexEntry, SearchResult};
pub use embedding::{EmbeddingGateway, EmbeddingProvider};
pub use error::{RagError, Result};
pub use hash::{DEFAULT_HASH_DIMENSIONS, HashEmbeddingProvider};
pub use index::{INDEX_FILE_NAME, VectorIndex, cosine_similarity};
pub use llm::{Llm, LlmGateway};
pub use loader::{CorpusLoader, Documents, SkippedFile};
pub use memory::{ConversationMemory, ConversationTurn, QuestionCondenser};
pub use retriever::Retriever;
pub use session::{Answer, AnsweringSession, AnsweringSessionBuilder, SessionState};

#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
