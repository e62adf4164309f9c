//! Interactive terminal chat.

use anyhow::Result;
use docchat_rag::AnsweringSession;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::sources::{sources_listing, sources_summary};

const BANNER: &str = "\
Ask me anything about the documentation.
Type 'quit', 'exit', or 'bye' to end the conversation.
Type 'sources' after any answer to see its source documents.
Type 'reset' to start a new conversation.";

/// What the console should do after one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print the text and keep reading.
    Say(String),
    /// Print the text and stop.
    Quit(String),
    /// Nothing to print.
    Nothing,
}

/// Line-oriented chat front-end over one [`AnsweringSession`].
#[derive(Debug)]
pub struct Console {
    session: AnsweringSession,
    last_sources: Vec<String>,
}

impl Console {
    pub fn new(session: AnsweringSession) -> Self {
        Self { session, last_sources: Vec::new() }
    }

    /// Handle one line of user input.
    ///
    /// Failed turns are reported as the reply; the conversation carries on.
    pub async fn respond(&mut self, input: &str) -> Reply {
        let input = input.trim();
        if input.is_empty() {
            return Reply::Nothing;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "bye" => {
                self.session.shutdown();
                return Reply::Quit("Goodbye!".to_string());
            }
            "sources" if !self.last_sources.is_empty() => {
                return Reply::Say(format!("Source documents:\n{}", sources_listing(&self.last_sources)));
            }
            "reset" => {
                self.session.reset();
                self.last_sources.clear();
                return Reply::Say("Conversation cleared.".to_string());
            }
            _ => {}
        }

        match self.session.ask(input).await {
            Ok(answer) => {
                let mut text = format!("Assistant: {}", answer.answer);
                if !answer.sources.is_empty() {
                    text.push_str(&format!(
                        "\n\n(Based on {} - type 'sources' to view)",
                        sources_summary(&answer.sources)
                    ));
                }
                self.last_sources = answer.sources;
                Reply::Say(text)
            }
            Err(e) => Reply::Say(format!("Error: {e}")),
        }
    }

    /// Run the read-eval-print loop until the user quits or closes input.
    pub async fn run(mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("{BANNER}\n");

        loop {
            let line = match editor.readline("You: ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    println!("\nGoodbye!");
                    self.session.shutdown();
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            let _ = editor.add_history_entry(line.as_str());

            match self.respond(&line).await {
                Reply::Say(text) => println!("\n{text}\n"),
                Reply::Quit(text) => {
                    println!("\n{text}");
                    break;
                }
                Reply::Nothing => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use docchat_rag::{
        EmbeddingGateway, HashEmbeddingProvider, Llm, LlmGateway, RagError, SessionState,
        VectorIndex,
    };

    use super::*;

    struct Echo;

    #[async_trait]
    impl Llm for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> docchat_rag::Result<String> {
            if prompt.contains("explode") {
                return Err(RagError::GenerationFailed {
                    model: "echo".to_string(),
                    message: "boom".to_string(),
                });
            }
            Ok("an answer".to_string())
        }
    }

    fn console() -> Console {
        let embeddings = EmbeddingGateway::new(Arc::new(HashEmbeddingProvider::new(16).unwrap()));
        let session = AnsweringSession::builder()
            .index(Arc::new(VectorIndex::empty("hash-16", 16)))
            .embeddings(embeddings)
            .llm(LlmGateway::new(Arc::new(Echo)))
            .build()
            .unwrap();
        Console::new(session)
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        assert_eq!(console().respond("   ").await, Reply::Nothing);
    }

    #[tokio::test]
    async fn quit_words_end_the_session() {
        for word in ["quit", "EXIT", "Bye"] {
            let mut console = console();
            assert!(matches!(console.respond(word).await, Reply::Quit(_)));
            assert_eq!(console.session.state(), SessionState::Closed);
        }
    }

    #[tokio::test]
    async fn errors_are_reported_as_the_answer() {
        let mut console = console();
        let reply = console.respond("please explode").await;
        assert!(matches!(reply, Reply::Say(ref text) if text.starts_with("Error: Generation failed")));

        let reply = console.respond("a normal question").await;
        assert_eq!(reply, Reply::Say("Assistant: an answer".to_string()));
        assert_eq!(console.session.memory().len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_the_conversation() {
        let mut console = console();
        console.respond("first question").await;
        assert_eq!(console.respond("reset").await, Reply::Say("Conversation cleared.".to_string()));
        assert!(console.session.memory().is_empty());
    }
}
