//! Persistence boundary for questions and evaluation records, plus the in-memory
//! implementation used by this deployment and by tests.
//!
//! Question text is unique across the store; the ingestion pipeline checks
//! `question_exists` before committing each validated question.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{Difficulty, EvaluationOutcome, QuestionType, SkillType, ValidatedQuestion};
use crate::error::StoreError;

/// Batch metadata attached to every stored question.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionMeta {
  pub topic: String,
  pub difficulty: Difficulty,
  pub skill_type: SkillType,
  pub managerial_level: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredQuestion {
  pub id: Uuid,
  pub question: ValidatedQuestion,
  pub meta: QuestionMeta,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvaluationRecord {
  pub id: Uuid,
  pub question_id: Uuid,
  pub user_answer: String,
  pub outcome: EvaluationOutcome,
  pub user_id: Option<String>,
  pub quiz_attempt_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Predicate for question listing; `None` fields match everything.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct QuestionFilter {
  pub topic: Option<String>,
  pub difficulty: Option<Difficulty>,
  pub skill_type: Option<SkillType>,
  pub managerial_level: Option<String>,
  pub question_type: Option<QuestionType>,
}

impl QuestionFilter {
  pub fn matches(&self, q: &StoredQuestion) -> bool {
    self.topic.as_deref().map_or(true, |t| q.meta.topic == t)
      && self.difficulty.map_or(true, |d| q.meta.difficulty == d)
      && self.skill_type.map_or(true, |s| q.meta.skill_type == s)
      && self.managerial_level.as_deref().map_or(true, |l| q.meta.managerial_level.as_deref() == Some(l))
      && self.question_type.map_or(true, |t| q.question.question_type() == t)
  }
}

/// Fields supplied when an attempt is opened.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NewQuizAttempt {
  pub user_id: String,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
  #[serde(default)]
  pub skill_type: Option<SkillType>,
  #[serde(default)]
  pub managerial_level: Option<String>,
  #[serde(default)]
  pub num_questions: Option<usize>,
}

/// One user's pass through a quiz. `ended_at` and `score` are set when it is evaluated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizAttempt {
  pub id: String,
  pub user_id: String,
  pub started_at: DateTime<Utc>,
  pub ended_at: Option<DateTime<Utc>>,
  pub topic: Option<String>,
  pub difficulty: Option<Difficulty>,
  pub skill_type: Option<SkillType>,
  pub managerial_level: Option<String>,
  pub num_questions: Option<usize>,
  pub score: Option<f64>,
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
  async fn question_exists(&self, text: &str) -> Result<bool, StoreError>;

  /// Fails with `StoreError::DuplicateQuestion` if the text is already stored.
  async fn insert_question(&self, question: ValidatedQuestion, meta: QuestionMeta) -> Result<StoredQuestion, StoreError>;

  /// Newest-first texts for the given topic/skill (and level, when given).
  async fn recent_question_texts(
    &self,
    topic: &str,
    skill_type: SkillType,
    managerial_level: Option<&str>,
    limit: usize,
  ) -> Result<Vec<String>, StoreError>;

  async fn get_question(&self, id: Uuid) -> Result<Option<StoredQuestion>, StoreError>;

  async fn save_evaluation(&self, record: EvaluationRecord) -> Result<(), StoreError>;

  async fn evaluations_for_attempt(&self, quiz_attempt_id: &str) -> Result<Vec<EvaluationRecord>, StoreError>;

  async fn evaluations_for_user(&self, user_id: &str) -> Result<Vec<EvaluationRecord>, StoreError>;

  /// Newest-first questions matching `filter`, at most `limit`.
  async fn list_questions(&self, filter: &QuestionFilter, limit: usize) -> Result<Vec<StoredQuestion>, StoreError>;

  async fn create_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StoreError>;

  /// Stamp the final score and end time. `Ok(None)` if the attempt is unknown.
  async fn finish_attempt(&self, id: &str, score: f64, ended_at: DateTime<Utc>) -> Result<Option<QuizAttempt>, StoreError>;

  /// Newest-first attempts of one user.
  async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<QuizAttempt>, StoreError>;
}

/// In-memory store: questions in insertion order plus a text index.
#[derive(Default)]
pub struct MemoryStore {
  questions: RwLock<Vec<StoredQuestion>>,
  by_text: RwLock<HashMap<String, Uuid>>,
  evaluations: RwLock<Vec<EvaluationRecord>>,
  attempts: RwLock<Vec<QuizAttempt>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl QuestionStore for MemoryStore {
  async fn question_exists(&self, text: &str) -> Result<bool, StoreError> {
    Ok(self.by_text.read().await.contains_key(text))
  }

  #[instrument(level = "debug", skip(self, question, meta), fields(text_len = question.text().len()))]
  async fn insert_question(&self, question: ValidatedQuestion, meta: QuestionMeta) -> Result<StoredQuestion, StoreError> {
    // Lock order: by_text, then questions.
    let mut by_text = self.by_text.write().await;
    if by_text.contains_key(question.text()) {
      return Err(StoreError::DuplicateQuestion(question.text().to_string()));
    }
    let stored = StoredQuestion { id: Uuid::new_v4(), question, meta, created_at: Utc::now() };
    by_text.insert(stored.question.text().to_string(), stored.id);
    self.questions.write().await.push(stored.clone());
    debug!(target: "quizsmith_backend", id = %stored.id, "Question stored");
    Ok(stored)
  }

  async fn recent_question_texts(
    &self,
    topic: &str,
    skill_type: SkillType,
    managerial_level: Option<&str>,
    limit: usize,
  ) -> Result<Vec<String>, StoreError> {
    let questions = self.questions.read().await;
    Ok(
      questions
        .iter()
        .rev()
        .filter(|q| q.meta.topic == topic && q.meta.skill_type == skill_type)
        .filter(|q| managerial_level.map_or(true, |lvl| q.meta.managerial_level.as_deref() == Some(lvl)))
        .take(limit)
        .map(|q| q.question.text().to_string())
        .collect(),
    )
  }

  async fn get_question(&self, id: Uuid) -> Result<Option<StoredQuestion>, StoreError> {
    Ok(self.questions.read().await.iter().find(|q| q.id == id).cloned())
  }

  async fn save_evaluation(&self, record: EvaluationRecord) -> Result<(), StoreError> {
    self.evaluations.write().await.push(record);
    Ok(())
  }

  async fn evaluations_for_attempt(&self, quiz_attempt_id: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
    Ok(
      self
        .evaluations
        .read()
        .await
        .iter()
        .filter(|r| r.quiz_attempt_id.as_deref() == Some(quiz_attempt_id))
        .cloned()
        .collect(),
    )
  }

  async fn evaluations_for_user(&self, user_id: &str) -> Result<Vec<EvaluationRecord>, StoreError> {
    let evaluations = self.evaluations.read().await;
    Ok(evaluations.iter().filter(|r| r.user_id.as_deref() == Some(user_id)).cloned().collect())
  }

  async fn list_questions(&self, filter: &QuestionFilter, limit: usize) -> Result<Vec<StoredQuestion>, StoreError> {
    let questions = self.questions.read().await;
    Ok(questions.iter().rev().filter(|q| filter.matches(q)).take(limit).cloned().collect())
  }

  #[instrument(level = "debug", skip(self, attempt), fields(user_id = %attempt.user_id))]
  async fn create_attempt(&self, attempt: NewQuizAttempt) -> Result<QuizAttempt, StoreError> {
    let created = QuizAttempt {
      id: Uuid::new_v4().to_string(),
      user_id: attempt.user_id,
      started_at: Utc::now(),
      ended_at: None,
      topic: attempt.topic,
      difficulty: attempt.difficulty,
      skill_type: attempt.skill_type,
      managerial_level: attempt.managerial_level,
      num_questions: attempt.num_questions,
      score: None,
    };
    self.attempts.write().await.push(created.clone());
    debug!(target: "quizsmith_backend", id = %created.id, "Quiz attempt opened");
    Ok(created)
  }

  async fn finish_attempt(&self, id: &str, score: f64, ended_at: DateTime<Utc>) -> Result<Option<QuizAttempt>, StoreError> {
    let mut attempts = self.attempts.write().await;
    Ok(attempts.iter_mut().find(|a| a.id == id).map(|a| {
      a.score = Some(score);
      a.ended_at = Some(ended_at);
      a.clone()
    }))
  }

  async fn attempts_for_user(&self, user_id: &str) -> Result<Vec<QuizAttempt>, StoreError> {
    let attempts = self.attempts.read().await;
    Ok(attempts.iter().rev().filter(|a| a.user_id == user_id).cloned().collect())
  }
}
