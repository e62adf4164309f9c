//! The per-user answering session.
//!
//! An [`AnsweringSession`] turns one question at a time into a grounded
//! answer: condense the question against the conversation so far, retrieve
//! matching chunks, prompt the language model with them, then record the
//! turn. `ask` takes `&mut self`, so one session cannot run two turns at once;
//! serve several users with one session each over a shared index.
//!
//! # Example
//!
//! ```rust,ignore
//! use docchat_rag::{AnsweringSession, RagConfig};
//!
//! let mut session = AnsweringSession::builder()
//!     .config(RagConfig::default())
//!     .index(index)
//!     .embeddings(embeddings)
//!     .llm(llm)
//!     .build()?;
//!
//! let answer = session.ask("How do I connect to Binance?").await?;
//! println!("{} ({:?})", answer.answer, answer.sources);
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::RagConfig;
use crate::document::SearchResult;
use crate::embedding::EmbeddingGateway;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::llm::LlmGateway;
use crate::memory::{ConversationMemory, ConversationTurn, QuestionCondenser};
use crate::prompt::answer_prompt;
use crate::retriever::Retriever;

/// Lifecycle of an [`AnsweringSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Ready for the next question.
    Idle,
    /// A question is being processed.
    AwaitingAnswer,
    /// Shut down; every further `ask` fails with [`RagError::SessionClosed`].
    Closed,
}

/// The result of one successful turn.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The model's answer.
    pub answer: String,
    /// The question after condensation, as used for retrieval.
    pub standalone_question: String,
    /// Distinct source ids of the retrieved chunks, best match first.
    pub sources: Vec<String>,
    /// The retrieved chunks with their scores, best match first.
    pub source_documents: Vec<SearchResult>,
}

/// Gateway handles released by [`AnsweringSession::shutdown`].
#[derive(Debug)]
struct SessionParts {
    retriever: Retriever,
    condenser: QuestionCondenser,
    llm: LlmGateway,
}

/// A single-user question answering session.
#[derive(Debug)]
pub struct AnsweringSession {
    state: SessionState,
    memory: ConversationMemory,
    top_k: usize,
    parts: Option<SessionParts>,
}

impl AnsweringSession {
    /// Create a new [`AnsweringSessionBuilder`].
    pub fn builder() -> AnsweringSessionBuilder {
        AnsweringSessionBuilder::default()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The conversation so far.
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Number of chunks retrieved per question.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// The index this session searches, unless the session is closed.
    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.parts.as_ref().map(|parts| parts.retriever.index())
    }

    /// Answer `question` using the documentation index and the conversation
    /// so far.
    ///
    /// When retrieval finds nothing (for example because the index is empty)
    /// the model is still asked, without context, and the answer is
    /// ungrounded. On any error the conversation is left untouched and the
    /// session stays usable, so the caller may retry.
    ///
    /// # Errors
    ///
    /// - [`RagError::SessionClosed`] after [`shutdown`](Self::shutdown)
    /// - [`RagError::GatewayTimeout`] if a gateway call exceeds its deadline
    /// - [`RagError::GenerationFailed`] if the language model fails
    /// - embedding errors from the retrieval step
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let parts = self.parts.as_ref().ok_or(RagError::SessionClosed)?;

        self.state = SessionState::AwaitingAnswer;
        let outcome = run_turn(parts, self.memory.turns(), self.top_k, question).await;
        self.state = SessionState::Idle;

        let answer = outcome?;
        self.memory.append(ConversationTurn {
            question: question.to_string(),
            answer: answer.answer.clone(),
            cited_source_ids: answer.sources.clone(),
        });
        info!(
            turn = self.memory.len(),
            source_count = answer.sources.len(),
            "answered question"
        );
        Ok(answer)
    }

    /// Forget the conversation. The index and gateways are kept.
    pub fn reset(&mut self) {
        self.memory.clear();
        info!("conversation reset");
    }

    /// Close the session and release its gateway handles.
    pub fn shutdown(&mut self) {
        self.parts = None;
        self.memory.clear();
        self.state = SessionState::Closed;
        info!("session closed");
    }
}

async fn run_turn(
    parts: &SessionParts,
    history: &[ConversationTurn],
    top_k: usize,
    question: &str,
) -> Result<Answer> {
    let standalone_question = parts.condenser.condense(history, question).await?;

    let source_documents = parts.retriever.retrieve(&standalone_question, top_k).await?;
    if source_documents.is_empty() {
        warn!(question = %standalone_question, "no documentation retrieved, answering without context");
    }

    let prompt = answer_prompt(&standalone_question, &source_documents);
    let answer = parts.llm.generate(&prompt).await?;

    Ok(Answer {
        answer: answer.trim().to_string(),
        standalone_question,
        sources: cited_sources(&source_documents),
        source_documents,
    })
}

/// Distinct source ids in first-seen order.
pub fn cited_sources(results: &[SearchResult]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for result in results {
        if !sources.contains(&result.chunk.source_id) {
            sources.push(result.chunk.source_id.clone());
        }
    }
    sources
}

/// Builder for constructing an [`AnsweringSession`].
///
/// `index`, `embeddings` and `llm` are required; `config` defaults to
/// [`RagConfig::default`].
#[derive(Default)]
pub struct AnsweringSessionBuilder {
    config: Option<RagConfig>,
    index: Option<Arc<VectorIndex>>,
    embeddings: Option<EmbeddingGateway>,
    llm: Option<LlmGateway>,
}

impl AnsweringSessionBuilder {
    /// Set the session configuration (`top_k`, `history_turns`).
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the index to search.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the embedding gateway used for queries.
    pub fn embeddings(mut self, embeddings: EmbeddingGateway) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Set the language model gateway used for condensation and answers.
    pub fn llm(mut self, llm: LlmGateway) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if a required part is missing or the config
    ///   is invalid
    /// - [`RagError::DimensionMismatch`] if the index and the embedding
    ///   gateway disagree on dimension
    pub fn build(self) -> Result<AnsweringSession> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let index =
            self.index.ok_or_else(|| RagError::ConfigError("index is required".to_string()))?;
        let embeddings = self
            .embeddings
            .ok_or_else(|| RagError::ConfigError("embeddings is required".to_string()))?;
        let llm = self.llm.ok_or_else(|| RagError::ConfigError("llm is required".to_string()))?;

        embeddings.ensure_available()?;
        let retriever = Retriever::new(embeddings, index)?;
        let condenser = QuestionCondenser::new(llm.clone(), config.history_turns);

        Ok(AnsweringSession {
            state: SessionState::Idle,
            memory: ConversationMemory::new(),
            top_k: config.top_k,
            parts: Some(SessionParts { retriever, condenser, llm }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Chunk;

    fn result(source: &str, n: usize) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: format!("{source}_{n}"),
                source_id: source.to_string(),
                text: String::new(),
                sequence_index: n,
                offset: 0,
            },
            score: 1.0,
        }
    }

    #[test]
    fn cited_sources_are_deduplicated_in_order() {
        let results = vec![result("b.md", 0), result("a.md", 0), result("b.md", 1)];
        assert_eq!(cited_sources(&results), vec!["b.md".to_string(), "a.md".to_string()]);
    }
}
