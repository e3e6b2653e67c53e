//! Quizsmith · Question Ingestion & Evaluation Backend
//!
//! - Axum HTTP API
//! - Optional OpenAI-compatible generation service (via environment variables)
//! - In-memory question and evaluation store
//!
//! Important env variables:
//!   PORT                 : u16 (default 8000)
//!   GENERATION_API_KEY   : enables question generation and generation-scored evaluation
//!   GENERATION_BASE_URL  : default "https://api.groq.com/openai/v1"
//!   GENERATION_MODEL     : default "llama3-70b-8192"
//!   QUIZ_CONFIG_PATH     : path to TOML config (prompts + pipeline knobs)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use quizsmith_backend::routes::build_router;
use quizsmith_backend::state::AppState;
use quizsmith_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Config, generation client and store.
  let state = Arc::new(AppState::from_env());

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizsmith_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "quizsmith_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "quizsmith_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
