//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - JSON API under `/api/v1/...`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/questions", get(http::http_get_questions))
        .route("/api/v1/questions/generate", post(http::http_post_generate))
        .route("/api/v1/quiz/evaluate", post(http::http_post_quiz_evaluate))
        .route("/api/v1/quiz/attempt", post(http::http_post_quiz_attempt))
        .route("/api/v1/quiz/attempts/:user_id", get(http::http_get_user_attempts))
        .route("/api/v1/quiz/attempt/:attempt_id/evaluations", get(http::http_get_attempt_evaluations))
        .route("/api/v1/stats/user/:user_id", get(http::http_get_user_stats))
        .route("/api/v1/evaluate", post(http::http_post_evaluate))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
