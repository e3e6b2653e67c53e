//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and clients independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Difficulty, EvaluationMethod, QuestionType, SkillType, ValidatedQuestion};
use crate::store::{EvaluationRecord, QuestionFilter, StoredQuestion};

fn default_num_questions() -> usize {
    5
}

fn default_list_limit() -> usize {
    100
}

/// Request for one generated batch of questions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestionBatchRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub skill_type: SkillType,
    #[serde(default)]
    pub managerial_level: Option<String>,
    #[serde(default = "default_num_questions")]
    pub num_questions: usize,
    #[serde(default)]
    pub question_type: QuestionType,
}

/// DTO for a stored question, flattened the way clients consume it.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_text: String,
    pub answer: String,
    pub options: Option<Vec<String>>,
    pub topic: String,
    pub difficulty: Difficulty,
    pub skill_type: SkillType,
    pub managerial_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Convert a stored question (internal) to the public DTO.
pub fn to_out(q: &StoredQuestion) -> QuestionOut {
    QuestionOut {
        id: q.id,
        question_type: q.question.question_type(),
        question_text: q.question.text().to_string(),
        answer: q.question.expected_answer().to_string(),
        options: q.question.options().map(|o| o.to_vec()),
        topic: q.meta.topic.clone(),
        difficulty: q.meta.difficulty,
        skill_type: q.meta.skill_type,
        managerial_level: q.meta.managerial_level.clone(),
        created_at: q.created_at,
    }
}

/// Query string of `GET /api/v1/questions`.
#[derive(Debug, Deserialize)]
pub struct QuestionListQuery {
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub skill_type: Option<SkillType>,
    pub managerial_level: Option<String>,
    pub question_type: Option<QuestionType>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

impl QuestionListQuery {
    pub fn filter(&self) -> QuestionFilter {
        QuestionFilter {
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            skill_type: self.skill_type,
            managerial_level: self.managerial_level.clone(),
            question_type: self.question_type,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserAnswer {
    pub question_id: Uuid,
    pub user_answer: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuizEvaluationRequest {
    pub answers: Vec<UserAnswer>,
    #[serde(default)]
    pub quiz_attempt_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct EvaluationResult {
    pub question_id: Uuid,
    pub question_text: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub score: f64,
    pub feedback: String,
    pub is_correct: bool,
    pub evaluation_method: EvaluationMethod,
}

impl EvaluationResult {
    pub fn from_record(record: &EvaluationRecord, question: &ValidatedQuestion, pass_threshold: f64) -> Self {
        Self {
            question_id: record.question_id,
            question_text: question.text().to_string(),
            user_answer: record.user_answer.clone(),
            correct_answer: question.expected_answer().to_string(),
            score: record.outcome.score,
            feedback: record.outcome.feedback.clone(),
            is_correct: record.outcome.score >= pass_threshold,
            evaluation_method: record.outcome.method,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizEvaluationResponse {
    pub total_questions: usize,
    pub total_score: f64,
    pub percentage_score: f64,
    pub evaluations: Vec<EvaluationResult>,
    /// Answers that could not be evaluated (unknown question, store failure).
    pub skipped: usize,
    pub quiz_attempt_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SingleEvaluationIn {
    pub question_id: Uuid,
    pub user_answer: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub version: &'static str,
    pub generation_enabled: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub message: String,
}
