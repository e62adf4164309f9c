//! Front-ends for `docchat`: the `build` command, a terminal console and an
//! HTTP chat endpoint, all configured from flags and environment variables.

pub mod app;
pub mod console;
pub mod server;
pub mod settings;
pub mod sources;
pub mod telemetry;

pub use app::{IndexSource, build_index, open_session};
pub use console::{Console, Reply};
pub use server::{AppState, ChatRequest, ChatResponse, ServerConfig, app_router, run_server};
pub use settings::{Cli, Command, EmbeddingBackend, Settings};
