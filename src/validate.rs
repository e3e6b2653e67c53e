//! Schema validator: per-type structural checks plus in-batch deduplication.
//!
//! Never fails the batch. Each candidate becomes `Ok(question)` or `Err(rejection)`
//! and the results are folded into accepted questions plus a rejected count.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::domain::{CandidateRecord, McqQuestion, QuestionType, SubjectiveQuestion, ValidatedQuestion};
use crate::error::Rejection;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchValidation {
  pub accepted: Vec<ValidatedQuestion>,
  pub rejected: usize,
}

/// Validate candidates as `question_type`. First occurrence of a question text wins.
pub fn validate_batch(candidates: &[CandidateRecord], question_type: QuestionType) -> BatchValidation {
  let mut seen: HashSet<String> = HashSet::new();

  let out = candidates.iter().enumerate().fold(BatchValidation::default(), |mut acc, (idx, c)| {
    match validate_one(c, question_type, &seen) {
      Ok(q) => {
        seen.insert(q.text().to_string());
        acc.accepted.push(q);
      }
      Err(reason) => {
        debug!(target: "ingest", index = idx, %reason, "Candidate rejected");
        acc.rejected += 1;
      }
    }
    acc
  });

  debug!(target: "ingest", %question_type, accepted = out.accepted.len(), rejected = out.rejected, "Batch validated");
  out
}

fn validate_one(
  c: &CandidateRecord,
  question_type: QuestionType,
  seen: &HashSet<String>,
) -> Result<ValidatedQuestion, Rejection> {
  if !c.is_object() {
    return Err(Rejection::NotAnObject);
  }
  let text = c.question().unwrap_or_default();
  if seen.contains(text.trim()) {
    return Err(Rejection::DuplicateQuestion);
  }

  match question_type {
    QuestionType::Mcq => {
      let options = string_options(c)?;
      let answer = c.answer().unwrap_or_default();
      McqQuestion::try_new(text, options, &answer).map(ValidatedQuestion::Mcq)
    }
    QuestionType::Subjective => {
      let answer = c.answer().unwrap_or_default();
      SubjectiveQuestion::try_new(text, &answer).map(ValidatedQuestion::Subjective)
    }
  }
}

fn string_options(c: &CandidateRecord) -> Result<Vec<String>, Rejection> {
  let options = c.options().ok_or(Rejection::WrongOptionCount(0))?;
  options
    .iter()
    .map(|o| match o {
      Value::String(s) => Ok(s.clone()),
      _ => Err(Rejection::OptionsNotStrings),
    })
    .collect()
}
