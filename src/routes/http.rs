//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Pipeline errors are mapped to status codes in one place (`ApiError`).

use std::sync::Arc;
use axum::{extract::{Path, Query, State}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument, warn};

use crate::error::{EvaluationRunError, IngestError, ItemFailure, StoreError};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;
use crate::stats::UserStats;
use crate::store::{NewQuizAttempt, QuizAttempt};

/// Status + message pair rendered as `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
  status: StatusCode,
  message: String,
}

impl ApiError {
  fn new(status: StatusCode, message: impl ToString) -> Self {
    Self { status, message: message.to_string() }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status, Json(ErrorOut { message: self.message })).into_response()
  }
}

impl From<IngestError> for ApiError {
  fn from(e: IngestError) -> Self {
    let status = match &e {
      IngestError::GeneratorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      IngestError::Generation(_) | IngestError::NoValidCandidates { .. } => StatusCode::BAD_GATEWAY,
      IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Self::new(status, e)
  }
}

impl From<EvaluationRunError> for ApiError {
  fn from(e: EvaluationRunError) -> Self {
    Self::new(StatusCode::BAD_REQUEST, e)
  }
}

impl From<ItemFailure> for ApiError {
  fn from(e: ItemFailure) -> Self {
    let status = match &e {
      ItemFailure::QuestionNotFound(_) => StatusCode::NOT_FOUND,
      ItemFailure::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Self::new(status, e)
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    Self::new(StatusCode::INTERNAL_SERVER_ERROR, e)
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, version: env!("CARGO_PKG_VERSION"), generation_enabled: state.generator.is_some() })
}

#[instrument(level = "info", skip(state, body), fields(topic = %body.topic, question_type = %body.question_type))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuestionBatchRequest>,
) -> Result<Json<Vec<QuestionOut>>, ApiError> {
  let created = generate_questions(&state, &body).await.map_err(|e| {
    warn!(target: "ingest", error = %e, "Question generation failed");
    ApiError::from(e)
  })?;
  info!(target: "ingest", created = created.len(), "HTTP generate served");
  Ok(Json(created.iter().map(to_out).collect()))
}

#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len()))]
pub async fn http_post_quiz_evaluate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizEvaluationRequest>,
) -> Result<Json<QuizEvaluationResponse>, ApiError> {
  let response = evaluate_quiz(&state, &body).await?;
  Ok(Json(response))
}

#[instrument(level = "info", skip(state, body), fields(%body.question_id, answer_len = body.user_answer.len()))]
pub async fn http_post_evaluate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SingleEvaluationIn>,
) -> Result<impl IntoResponse, ApiError> {
  let outcome = evaluate_single(&state, body.question_id, &body.user_answer).await?;
  info!(target: "evaluation", id = %body.question_id, score = %format!("{:.2}", outcome.score), "HTTP evaluate served");
  Ok(Json(outcome))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_attempt_evaluations(
  State(state): State<Arc<AppState>>,
  Path(attempt_id): Path<String>,
) -> Result<Json<Vec<EvaluationResult>>, ApiError> {
  Ok(Json(attempt_evaluations(&state, &attempt_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_questions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuestionListQuery>,
) -> Result<Json<Vec<QuestionOut>>, ApiError> {
  let questions = list_questions(&state, &q.filter(), q.limit).await?;
  Ok(Json(questions.iter().map(to_out).collect()))
}

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id))]
pub async fn http_post_quiz_attempt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NewQuizAttempt>,
) -> Result<Json<QuizAttempt>, ApiError> {
  let attempt = create_quiz_attempt(&state, body).await?;
  info!(target: "evaluation", id = %attempt.id, "HTTP quiz attempt created");
  Ok(Json(attempt))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user_attempts(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<Vec<QuizAttempt>>, ApiError> {
  Ok(Json(user_attempts(&state, &user_id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user_stats(
  State(state): State<Arc<AppState>>,
  Path(user_id): Path<String>,
) -> Result<Json<UserStats>, ApiError> {
  match user_statistics(&state, &user_id).await? {
    Some(stats) => Ok(Json(stats)),
    None => Err(ApiError::new(StatusCode::NOT_FOUND, "No evaluations found for this user")),
  }
}
