//! Per-user aggregates over stored evaluation records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::EvaluationMethod;
use crate::store::EvaluationRecord;

/// Records counted by `recent_performance`.
const RECENT_WINDOW: usize = 10;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MethodStats {
  pub method: EvaluationMethod,
  pub count: usize,
  pub average_score: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct UserStats {
  pub user_id: String,
  pub total_questions_attempted: usize,
  pub overall_average_score: f64,
  pub overall_percentage: f64,
  pub mcq_questions: usize,
  pub mcq_correct: usize,
  pub mcq_accuracy: f64,
  pub subjective_questions: usize,
  pub subjective_average_score: f64,
  pub subjective_percentage: f64,
  /// Percentage over the most recent evaluations.
  pub recent_performance: f64,
  pub methods: Vec<MethodStats>,
  pub first_attempt: DateTime<Utc>,
  pub last_attempt: DateTime<Utc>,
}

fn round_to(x: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (x * factor).round() / factor
}

fn mean(scores: impl Iterator<Item = f64>) -> f64 {
  let (sum, n) = scores.fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
  if n == 0 { 0.0 } else { sum / n as f64 }
}

/// `None` when the user has no evaluations.
pub fn user_stats(user_id: &str, records: &[EvaluationRecord]) -> Option<UserStats> {
  let first_attempt = records.iter().map(|r| r.created_at).min()?;
  let last_attempt = records.iter().map(|r| r.created_at).max()?;

  let is_mcq = |r: &&EvaluationRecord| r.outcome.method == EvaluationMethod::ExactMatch;
  let mcq: Vec<&EvaluationRecord> = records.iter().filter(is_mcq).collect();
  let subjective: Vec<&EvaluationRecord> = records.iter().filter(|r| !is_mcq(r)).collect();

  let mcq_correct = mcq.iter().filter(|r| r.outcome.score >= 1.0).count();
  let mcq_accuracy = if mcq.is_empty() { 0.0 } else { mcq_correct as f64 / mcq.len() as f64 * 100.0 };
  let subjective_avg = mean(subjective.iter().map(|r| r.outcome.score));
  let overall_avg = mean(records.iter().map(|r| r.outcome.score));

  let mut newest: Vec<&EvaluationRecord> = records.iter().collect();
  newest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  let recent_avg = mean(newest.iter().take(RECENT_WINDOW).map(|r| r.outcome.score));

  let methods = [EvaluationMethod::ExactMatch, EvaluationMethod::GenerationScored, EvaluationMethod::KeywordFallback]
    .into_iter()
    .filter_map(|method| {
      let scores: Vec<f64> = records.iter().filter(|r| r.outcome.method == method).map(|r| r.outcome.score).collect();
      (!scores.is_empty()).then(|| MethodStats {
        method,
        count: scores.len(),
        average_score: round_to(mean(scores.iter().copied()), 3),
      })
    })
    .collect();

  Some(UserStats {
    user_id: user_id.to_string(),
    total_questions_attempted: records.len(),
    overall_average_score: round_to(overall_avg, 3),
    overall_percentage: round_to(overall_avg * 100.0, 1),
    mcq_questions: mcq.len(),
    mcq_correct,
    mcq_accuracy: round_to(mcq_accuracy, 1),
    subjective_questions: subjective.len(),
    subjective_average_score: round_to(subjective_avg, 3),
    subjective_percentage: round_to(subjective_avg * 100.0, 1),
    recent_performance: round_to(recent_avg * 100.0, 1),
    methods,
    first_attempt,
    last_attempt,
  })
}
