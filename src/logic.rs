//! Pipelines shared by the HTTP handlers.
//!
//! This includes:
//!   - question ingestion (avoid list → orchestrator → validator → duplicate check → store)
//!   - quiz evaluation runs with per-answer failure isolation and attempt tracking
//!   - single-answer evaluation, attempt lookups, question listing, user statistics

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::EvaluationOutcome;
use crate::error::{EvaluationRunError, IngestError, ItemFailure, StoreError};
use crate::evaluate::evaluate;
use crate::prompts::build_generation_prompt;
use crate::protocol::{EvaluationResult, QuestionBatchRequest, QuizEvaluationRequest, QuizEvaluationResponse, UserAnswer};
use crate::retry::fetch_validated_batch;
use crate::state::AppState;
use crate::stats::{user_stats, UserStats};
use crate::store::{EvaluationRecord, NewQuizAttempt, QuestionFilter, QuestionMeta, QuizAttempt, StoredQuestion};
use crate::validate::validate_batch;

#[instrument(level = "info", skip(state, req), fields(topic = %req.topic, question_type = %req.question_type, count = req.num_questions))]
pub async fn generate_questions(state: &AppState, req: &QuestionBatchRequest) -> Result<Vec<StoredQuestion>, IngestError> {
  let generator = state.generator().ok_or(IngestError::GeneratorUnavailable)?;
  let ingestion = &state.config.ingestion;

  let recent = state
    .store
    .recent_question_texts(&req.topic, req.skill_type, req.managerial_level.as_deref(), ingestion.recent_window)
    .await?;
  let prompt = build_generation_prompt(&state.config.prompts, req, &recent, ingestion.avoid_limit);

  let candidates = fetch_validated_batch(generator, &prompt, ingestion.max_attempts, req.question_type).await?;
  let validation = validate_batch(&candidates, req.question_type);
  if validation.accepted.is_empty() {
    warn!(target: "ingest", rejected = validation.rejected, "No candidate survived validation");
    return Err(IngestError::NoValidCandidates { question_type: req.question_type, rejected: validation.rejected });
  }

  let meta = QuestionMeta {
    topic: req.topic.clone(),
    difficulty: req.difficulty,
    skill_type: req.skill_type,
    managerial_level: req.managerial_level.clone(),
  };

  let mut created = Vec::with_capacity(validation.accepted.len());
  let mut already_stored = 0usize;
  for question in validation.accepted {
    if state.store.question_exists(question.text()).await? {
      already_stored += 1;
      continue;
    }
    match state.store.insert_question(question, meta.clone()).await {
      Ok(stored) => created.push(stored),
      // Lost a race with a concurrent batch; same outcome as the pre-check.
      Err(StoreError::DuplicateQuestion(_)) => already_stored += 1,
      Err(e) => return Err(e.into()),
    }
  }

  info!(
    target: "ingest",
    created = created.len(),
    already_stored,
    rejected = validation.rejected,
    "Question batch ingested"
  );
  Ok(created)
}

/// Evaluate every answer in order. A failing answer is logged and counted, never fatal;
/// the run fails only when nothing at all could be evaluated.
#[instrument(level = "info", skip(state, req), fields(answers = req.answers.len(), attempt = ?req.quiz_attempt_id))]
pub async fn evaluate_quiz(state: &AppState, req: &QuizEvaluationRequest) -> Result<QuizEvaluationResponse, EvaluationRunError> {
  if req.answers.is_empty() {
    return Err(EvaluationRunError::NoAnswers);
  }

  let quiz_attempt_id = match &req.quiz_attempt_id {
    Some(id) => Some(id.clone()),
    None => open_attempt_for(state, req).await,
  };

  let mut evaluations: Vec<EvaluationResult> = Vec::with_capacity(req.answers.len());
  let mut skipped = 0usize;
  for answer in &req.answers {
    match evaluate_one(state, answer, quiz_attempt_id.as_deref()).await {
      Ok(result) => {
        info!(target: "evaluation", question_id = %result.question_id, score = %format!("{:.2}", result.score), method = ?result.evaluation_method, "Answer evaluated");
        evaluations.push(result);
      }
      Err(e) => {
        error!(target: "evaluation", question_id = %answer.question_id, error = %e, "Skipping answer");
        skipped += 1;
      }
    }
  }

  let total_score: f64 = evaluations.iter().map(|e| e.score).sum();
  if let Some(id) = quiz_attempt_id.as_deref() {
    match state.store.finish_attempt(id, total_score, Utc::now()).await {
      Ok(Some(_)) => {}
      Ok(None) => warn!(target: "evaluation", attempt = %id, "Unknown quiz attempt; score not recorded"),
      Err(e) => error!(target: "evaluation", attempt = %id, error = %e, "Failed to close quiz attempt"),
    }
  }

  if evaluations.is_empty() {
    return Err(EvaluationRunError::NoEvaluations { skipped });
  }

  let percentage_score = total_score / evaluations.len() as f64 * 100.0;
  info!(target: "evaluation", percentage = %format!("{:.1}", percentage_score), total_score, evaluated = evaluations.len(), skipped, "Quiz evaluation completed");

  Ok(QuizEvaluationResponse {
    total_questions: evaluations.len(),
    total_score,
    percentage_score,
    evaluations,
    skipped,
    quiz_attempt_id,
  })
}

/// Open an attempt for the first answer's user when the caller did not supply one.
async fn open_attempt_for(state: &AppState, req: &QuizEvaluationRequest) -> Option<String> {
  let user_id = req.answers.first()?.user_id.clone()?;
  let new_attempt = NewQuizAttempt { user_id, num_questions: Some(req.answers.len()), ..Default::default() };
  match state.store.create_attempt(new_attempt).await {
    Ok(attempt) => {
      info!(target: "evaluation", attempt = %attempt.id, user_id = %attempt.user_id, "Quiz attempt opened");
      Some(attempt.id)
    }
    Err(e) => {
      error!(target: "evaluation", error = %e, "Failed to open quiz attempt; evaluating without one");
      None
    }
  }
}

async fn evaluate_one(state: &AppState, answer: &UserAnswer, quiz_attempt_id: Option<&str>) -> Result<EvaluationResult, ItemFailure> {
  let stored = state
    .store
    .get_question(answer.question_id)
    .await?
    .ok_or(ItemFailure::QuestionNotFound(answer.question_id))?;

  let outcome = evaluate(state.generator(), &state.config.prompts, &stored.question, &answer.user_answer).await;
  let record = EvaluationRecord {
    id: Uuid::new_v4(),
    question_id: stored.id,
    user_answer: answer.user_answer.clone(),
    outcome,
    user_id: answer.user_id.clone(),
    quiz_attempt_id: quiz_attempt_id.map(str::to_string),
    created_at: Utc::now(),
  };
  let result = EvaluationResult::from_record(&record, &stored.question, state.config.evaluation.pass_threshold);
  state.store.save_evaluation(record).await?;
  Ok(result)
}

/// Score one answer outside a quiz run. Nothing is persisted.
#[instrument(level = "info", skip(state, user_answer), fields(%question_id))]
pub async fn evaluate_single(state: &AppState, question_id: Uuid, user_answer: &str) -> Result<EvaluationOutcome, ItemFailure> {
  let stored = state
    .store
    .get_question(question_id)
    .await?
    .ok_or(ItemFailure::QuestionNotFound(question_id))?;
  Ok(evaluate(state.generator(), &state.config.prompts, &stored.question, user_answer).await)
}

/// Stored evaluations of one quiz attempt, joined with their questions.
/// Records whose question has disappeared are left out.
#[instrument(level = "info", skip(state))]
pub async fn attempt_evaluations(state: &AppState, quiz_attempt_id: &str) -> Result<Vec<EvaluationResult>, StoreError> {
  let records = state.store.evaluations_for_attempt(quiz_attempt_id).await?;
  let mut out = Vec::with_capacity(records.len());
  for record in &records {
    if let Some(q) = state.store.get_question(record.question_id).await? {
      out.push(EvaluationResult::from_record(record, &q.question, state.config.evaluation.pass_threshold));
    }
  }
  Ok(out)
}

#[instrument(level = "info", skip(state, new_attempt), fields(user_id = %new_attempt.user_id))]
pub async fn create_quiz_attempt(state: &AppState, new_attempt: NewQuizAttempt) -> Result<QuizAttempt, StoreError> {
  state.store.create_attempt(new_attempt).await
}

pub async fn user_attempts(state: &AppState, user_id: &str) -> Result<Vec<QuizAttempt>, StoreError> {
  state.store.attempts_for_user(user_id).await
}

/// Aggregates over every stored evaluation of `user_id`; `None` if there are none.
#[instrument(level = "info", skip(state))]
pub async fn user_statistics(state: &AppState, user_id: &str) -> Result<Option<UserStats>, StoreError> {
  let records = state.store.evaluations_for_user(user_id).await?;
  Ok(user_stats(user_id, &records))
}

pub async fn list_questions(state: &AppState, filter: &QuestionFilter, limit: usize) -> Result<Vec<StoredQuestion>, StoreError> {
  state.store.list_questions(filter, limit).await
}
