//! Conversation memory and follow-up question condensation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::llm::LlmGateway;
use crate::prompt::condense_prompt;

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    /// The question as the user asked it.
    pub question: String,
    /// The model's answer.
    pub answer: String,
    /// Sources of the retrieved chunks, deduplicated, best match first.
    pub cited_source_ids: Vec<String>,
}

/// Append-only log of the turns of one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed turn.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    /// Forget every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of recorded turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Rewrites follow-up questions into standalone questions.
#[derive(Debug, Clone)]
pub struct QuestionCondenser {
    llm: LlmGateway,
    history_turns: usize,
}

impl QuestionCondenser {
    /// Create a condenser that shows the model at most `history_turns` of the
    /// most recent turns.
    pub fn new(llm: LlmGateway, history_turns: usize) -> Self {
        Self { llm, history_turns }
    }

    /// Produce a question that can be understood without `history`.
    ///
    /// With no usable history the question is returned unchanged and the model
    /// is not called. A blank reply from the model also falls back to the
    /// original question.
    pub async fn condense(&self, history: &[ConversationTurn], question: &str) -> Result<String> {
        let window = &history[history.len().saturating_sub(self.history_turns)..];
        if window.is_empty() {
            return Ok(question.to_string());
        }

        let reply = self.llm.generate(&condense_prompt(window, question)).await?;
        let standalone = reply.trim();
        if standalone.is_empty() {
            debug!("condenser returned a blank reply, keeping the original question");
            return Ok(question.to_string());
        }

        debug!(question, standalone, "condensed follow-up question");
        Ok(standalone.to_string())
    }
}
