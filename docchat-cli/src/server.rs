use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use docchat_rag::AnsweringSession;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::sources::sources_summary;

/// Shared state: the single answering session behind a lock.
#[derive(Clone, Debug)]
pub struct AppState {
    pub session: Arc<Mutex<AnsweringSession>>,
}

impl AppState {
    pub fn new(session: AnsweringSession) -> Self {
        Self { session: Arc::new(Mutex::new(session)) }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 7860 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub sources_summary: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/reset", post(reset))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig, session: AnsweringSession) -> anyhow::Result<()> {
    let app = app_router(AppState::new(session));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docchat server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docchat listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"docchat"}))
}

async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<ChatResponse> {
    let message = request.message.trim();
    if message.is_empty() {
        return Json(ChatResponse {
            answer: "Please enter a question.".to_string(),
            sources: Vec::new(),
            sources_summary: String::new(),
        });
    }

    let mut session = state.session.lock().await;
    match session.ask(message).await {
        Ok(answer) => Json(ChatResponse {
            sources_summary: sources_summary(&answer.sources),
            answer: answer.answer,
            sources: answer.sources,
        }),
        Err(e) => {
            error!(error = %e, "chat turn failed");
            Json(ChatResponse {
                answer: format!("Error: {e}"),
                sources: Vec::new(),
                sources_summary: String::new(),
            })
        }
    }
}

async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    state.session.lock().await.reset();
    Json(json!({"status":"ok"}))
}
