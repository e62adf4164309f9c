use std::sync::Arc;

use async_trait::async_trait;
use docchat_cli::{AppState, ChatResponse, app_router};
use docchat_rag::{
    AnsweringSession, EmbeddingGateway, HashEmbeddingProvider, IndexBuilder, Llm, LlmGateway,
    RagConfig, RagError,
};
use serde_json::Value;

struct CannedLlm;

#[async_trait]
impl Llm for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, prompt: &str) -> docchat_rag::Result<String> {
        if prompt.contains("trigger failure") {
            return Err(RagError::GenerationFailed {
                model: "canned".to_string(),
                message: "upstream unavailable".to_string(),
            });
        }
        Ok("Set your API key and secret.".to_string())
    }
}

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let corpus = tempfile::tempdir().expect("corpus dir");
    for i in 1..=5 {
        std::fs::write(
            corpus.path().join(format!("connector{i}.md")),
            format!("Connector {i}\n\nTo connect, set API key and secret for exchange {i}."),
        )
        .expect("write corpus file");
    }

    let config = RagConfig::default();
    let embeddings =
        EmbeddingGateway::from_config(Arc::new(HashEmbeddingProvider::default()), &config);
    let (index, _) = IndexBuilder::new(embeddings.clone(), config.clone())
        .expect("builder")
        .build(corpus.path())
        .await
        .expect("build index");

    let session = AnsweringSession::builder()
        .config(config)
        .index(Arc::new(index))
        .embeddings(embeddings)
        .llm(LlmGateway::new(Arc::new(CannedLlm)))
        .build()
        .expect("session");
    let app = app_router(AppState::new(session));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, handle) = spawn_server().await;

    let response = reqwest::get(format!("{}/health", base)).await.expect("health response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("health json");
    assert_eq!(body.get("status").and_then(Value::as_str), Some("ok"));

    handle.abort();
}

#[tokio::test]
async fn chat_returns_answer_and_summarised_sources() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/chat", base))
        .json(&serde_json::json!({ "message": "How do I connect?" }))
        .send()
        .await
        .expect("chat response");
    assert!(response.status().is_success());

    let body: ChatResponse = response.json().await.expect("chat json");
    assert_eq!(body.answer, "Set your API key and secret.");
    assert_eq!(body.sources.len(), 5);
    assert!(body.sources_summary.ends_with(" and 2 more"), "{}", body.sources_summary);

    let reset = client.post(format!("{}/api/reset", base)).send().await.expect("reset response");
    assert!(reset.status().is_success());

    handle.abort();
}

#[tokio::test]
async fn failures_are_reported_as_the_answer() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let body: ChatResponse = client
        .post(format!("{}/api/chat", base))
        .json(&serde_json::json!({ "message": "please trigger failure" }))
        .send()
        .await
        .expect("chat response")
        .json()
        .await
        .expect("chat json");

    assert!(body.answer.starts_with("Error: "), "{}", body.answer);
    assert!(body.sources.is_empty());

    handle.abort();
}
