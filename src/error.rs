//! Error taxonomy for the ingestion and evaluation pipelines.
//!
//! Boundary errors (`RepairError`, `GenerationError`) are consumed by the retry
//! orchestrator; only `GenerationFailure` and `NoValidCandidates` reach callers
//! of the ingestion pipeline. Evaluation never produces an error per answer.

use thiserror::Error;

use crate::domain::QuestionType;

/// Text could not be coerced into parseable JSON after all repair passes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("repair failed: {reason} (sample: {sample:?})")]
pub struct RepairError {
  pub reason: String,
  /// Leading slice of the offending text, for diagnostics only.
  pub sample: String,
}

/// The upstream generation call itself failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
  #[error("generation request timed out")]
  Timeout,
  #[error("generation transport error: {0}")]
  Transport(String),
  #[error("generation service returned HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("generation response could not be decoded: {0}")]
  Decode(String),
  #[error("generation response contained no content")]
  EmptyContent,
}

/// Why a single orchestrator attempt was discarded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error(transparent)]
  Repair(#[from] RepairError),
  #[error("repaired text did not decode: {0}")]
  Decode(String),
  #[error("response is not a JSON array")]
  NotAnArray,
  #[error("response array is empty")]
  EmptyArray,
}

/// Retry budget exhausted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("generation failed after {attempts} attempt(s); last error: {last_reason}")]
pub struct GenerationFailure {
  pub attempts: usize,
  pub last_reason: String,
}

/// Why the validator dropped one candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
  #[error("candidate is not a JSON object")]
  NotAnObject,
  #[error("question text is missing or empty")]
  MissingQuestion,
  #[error("question text too short ({0} chars)")]
  QuestionTooShort(usize),
  #[error("question text already accepted in this batch")]
  DuplicateQuestion,
  #[error("options must be a list of exactly 4 strings")]
  OptionsNotStrings,
  #[error("expected 4 options, got {0}")]
  WrongOptionCount(usize),
  #[error("option {0:?} appears more than once")]
  DuplicateOption(String),
  #[error("answer {0:?} is not one of the options")]
  AnswerNotInOptions(String),
  #[error("answer is missing or empty")]
  EmptyAnswer,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
  #[error("question already stored: {0:?}")]
  DuplicateQuestion(String),
  #[error("store unavailable: {0}")]
  Unavailable(String),
}

/// Failures surfaced by the question ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
  #[error("no generation service configured")]
  GeneratorUnavailable,
  #[error(transparent)]
  Generation(#[from] GenerationFailure),
  #[error("no valid {question_type} questions could be generated ({rejected} candidate(s) rejected)")]
  NoValidCandidates { question_type: QuestionType, rejected: usize },
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Why one answer of a quiz run was skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemFailure {
  #[error("question {0} not found")]
  QuestionNotFound(uuid::Uuid),
  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Failures of a whole quiz evaluation run (individual answers never fail it).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationRunError {
  #[error("no answers provided")]
  NoAnswers,
  #[error("no valid evaluations could be performed ({skipped} answer(s) skipped)")]
  NoEvaluations { skipped: usize },
}
