//! Answer evaluation engine.
//!
//! MCQ answers are compared locally. Subjective answers are scored by the
//! generation service and degrade to keyword overlap on any failure, so every
//! call yields a complete `EvaluationOutcome`.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::Prompts;
use crate::domain::{EvaluationMethod, EvaluationOutcome, McqQuestion, SubjectiveQuestion, ValidatedQuestion};
use crate::generation::Generator;
use crate::prompts::build_evaluation_prompt;
use crate::repair::repair_object;

pub const DEFAULT_FEEDBACK: &str = "No feedback provided";
pub const FALLBACK_FEEDBACK: &str =
  "Automated evaluation (generation service unavailable). Score based on keyword overlap with the model answer.";

/// Score `user_answer` against `question`. `generator` is `None` when no generation
/// service is configured; subjective answers then go straight to the fallback.
#[instrument(level = "info", skip_all, fields(question_type = %question.question_type(), answer_len = user_answer.len()))]
pub async fn evaluate(
  generator: Option<&dyn Generator>,
  prompts: &Prompts,
  question: &ValidatedQuestion,
  user_answer: &str,
) -> EvaluationOutcome {
  match question {
    ValidatedQuestion::Mcq(q) => evaluate_mcq(q, user_answer),
    ValidatedQuestion::Subjective(q) => match generator {
      Some(g) => match score_with_generator(g, prompts, q, user_answer).await {
        Ok(outcome) => outcome,
        Err(reason) => {
          warn!(target: "evaluation", %reason, "Generation scoring failed; using keyword fallback");
          keyword_fallback(q.reference_answer(), user_answer)
        }
      },
      None => {
        debug!(target: "evaluation", "No generator configured; using keyword fallback");
        keyword_fallback(q.reference_answer(), user_answer)
      }
    },
  }
}

pub fn evaluate_mcq(q: &McqQuestion, user_answer: &str) -> EvaluationOutcome {
  let correct = user_answer.trim().to_lowercase() == q.correct_option().trim().to_lowercase();
  let (score, feedback) = if correct {
    (1.0, "Correct answer!".to_string())
  } else {
    (0.0, format!("Incorrect. The correct answer is: {}", q.correct_option()))
  };
  EvaluationOutcome { score, feedback, method: EvaluationMethod::ExactMatch }
}

async fn score_with_generator(
  generator: &dyn Generator,
  prompts: &Prompts,
  q: &SubjectiveQuestion,
  user_answer: &str,
) -> Result<EvaluationOutcome, String> {
  let prompt = build_evaluation_prompt(prompts, q.text(), q.reference_answer(), user_answer);
  let raw = generator.generate(&prompt).await.map_err(|e| e.to_string())?;
  let cleaned = repair_object(&raw).map_err(|e| e.to_string())?;
  let judgment: Value = serde_json::from_str(&cleaned).map_err(|e| format!("decode failed: {e}"))?;

  let score = judgment.get("score").map(numeric_score).unwrap_or(0.0);
  let feedback = judgment
    .get("feedback")
    .and_then(Value::as_str)
    .map(str::to_string)
    .unwrap_or_else(|| DEFAULT_FEEDBACK.to_string());

  Ok(EvaluationOutcome { score, feedback, method: EvaluationMethod::GenerationScored })
}

/// Numbers and numeric strings are accepted; anything else scores 0.0. Clamped into [0, 1].
fn numeric_score(v: &Value) -> f64 {
  let raw = match v {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok(),
    _ => None,
  };
  match raw {
    Some(s) if s.is_finite() => s.clamp(0.0, 1.0),
    _ => 0.0,
  }
}

/// Fraction of distinct reference words (lower-cased, whitespace-split) present in the answer.
pub fn keyword_overlap(reference: &str, user_answer: &str) -> f64 {
  let reference = reference.to_lowercase();
  let answer = user_answer.to_lowercase();
  let reference_words: HashSet<&str> = reference.split_whitespace().collect();
  if reference_words.is_empty() {
    return 0.0;
  }
  let answer_words: HashSet<&str> = answer.split_whitespace().collect();
  let overlap = answer_words.intersection(&reference_words).count();
  (overlap as f64 / reference_words.len() as f64).min(1.0)
}

pub fn keyword_fallback(reference: &str, user_answer: &str) -> EvaluationOutcome {
  EvaluationOutcome {
    score: keyword_overlap(reference, user_answer),
    feedback: FALLBACK_FEEDBACK.to_string(),
    method: EvaluationMethod::KeywordFallback,
  }
}
