//! Prompt templates for question condensation and grounded answering.

use crate::document::SearchResult;
use crate::memory::ConversationTurn;

const CONDENSE_TEMPLATE: &str = "\
Given the following conversation and a follow up question, rephrase the follow up \
question to be a standalone question that can be understood without the conversation. \
Keep the language of the follow up question. Reply with the standalone question only.

Chat History:
{chat_history}

Follow Up Input: {question}
Standalone question:";

const ANSWER_TEMPLATE: &str = "\
You are an assistant that answers questions about a product's documentation. \
Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:";

const NO_CONTEXT: &str = "(No documentation passages matched this question.)";

/// Build the prompt asking the model to rewrite `question` as a standalone
/// question, given the prior `turns`.
pub fn condense_prompt(turns: &[ConversationTurn], question: &str) -> String {
    let chat_history = turns
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n");

    CONDENSE_TEMPLATE.replace("{question}", question).replacen("{chat_history}", &chat_history, 1)
}

/// Build the grounded answering prompt.
///
/// Retrieved chunks appear in the given order (best match first), each
/// labelled with its source.
pub fn answer_prompt(question: &str, results: &[SearchResult]) -> String {
    let context = if results.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                format!("[{}] (source: {})\n{}", i + 1, result.chunk.source_id, result.chunk.text)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    // Context goes in last so placeholders inside chunk text stay literal.
    ANSWER_TEMPLATE.replace("{question}", question).replacen("{context}", &context, 1)
}
