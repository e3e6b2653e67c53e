//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,ingest=debug,evaluation=debug,tower_http=info").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Pipeline code logs under three targets: `quizsmith_backend` (service shell),
//! `ingest` (generation, repair, validation) and `evaluation` (answer scoring).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str =
  "info,ingest=debug,evaluation=debug,quizsmith_backend=debug,tower_http=info,axum=info";

pub fn init_tracing() {
  let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  // JSON and pretty produce different subscriber types, so each branch inits on its own.
  match std::env::var("LOG_FORMAT").as_deref() {
    Ok("json") => {
      builder.json().init();
    }
    _ => {
      builder.init();
    }
  }
}
