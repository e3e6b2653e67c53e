//! Retry orchestrator: generation + repair + decode, with escalating strictness.
//!
//! Attempts run one after another. Every failure (transport, repair, decode, shape)
//! is logged and burns one attempt; only exhaustion is reported to the caller.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::{CandidateRecord, QuestionType};
use crate::error::{AttemptFailure, GenerationFailure};
use crate::generation::Generator;
use crate::repair::repair;
use crate::util::trunc_for_log;

const JSON_ONLY_DIRECTIVE: &str = "\n\nIMPORTANT: Return ONLY valid JSON. Attempt {attempt}.";
const CLEAN_ARRAY_DIRECTIVE: &str = "\nNo explanations, no markdown, just clean JSON array.";

/// How hard the prompt leans on the model for this attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strictness {
  /// Prompt as given.
  Plain,
  /// Adds the "ONLY valid JSON" directive.
  JsonOnly,
  /// Also forbids markdown and explanations.
  CleanArray,
}

impl Strictness {
  /// `attempt` is 1-based. The third attempt and the final attempt get the strictest tier.
  pub fn for_attempt(attempt: usize, max_attempts: usize) -> Self {
    match attempt {
      0 | 1 => Strictness::Plain,
      n if n >= 3 || n == max_attempts => Strictness::CleanArray,
      _ => Strictness::JsonOnly,
    }
  }
}

pub fn escalated_prompt(prompt: &str, attempt: usize, max_attempts: usize) -> String {
  let mut out = prompt.to_string();
  let strictness = Strictness::for_attempt(attempt, max_attempts);
  if strictness != Strictness::Plain {
    out.push_str(&JSON_ONLY_DIRECTIVE.replace("{attempt}", &attempt.to_string()));
  }
  if strictness == Strictness::CleanArray {
    out.push_str(CLEAN_ARRAY_DIRECTIVE);
  }
  out
}

/// Ask the generator for a batch of candidate records, retrying up to `max_attempts` times.
/// A `max_attempts` of zero still makes one attempt.
#[instrument(level = "info", skip(generator, prompt), fields(prompt_len = prompt.len()))]
pub async fn fetch_validated_batch(
  generator: &dyn Generator,
  prompt: &str,
  max_attempts: usize,
  question_type: QuestionType,
) -> Result<Vec<CandidateRecord>, GenerationFailure> {
  let max_attempts = max_attempts.max(1);
  let mut last_failure: Option<AttemptFailure> = None;

  for attempt in 1..=max_attempts {
    info!(target: "ingest", attempt, max_attempts, "Generation attempt");
    let attempt_prompt = escalated_prompt(prompt, attempt, max_attempts);

    match run_attempt(generator, &attempt_prompt).await {
      Ok(batch) => {
        info!(target: "ingest", attempt, items = batch.len(), "Parsed candidate batch");
        return Ok(batch);
      }
      Err(e) => {
        warn!(target: "ingest", attempt, max_attempts, error = %e, "Generation attempt failed");
        last_failure = Some(e);
      }
    }
  }

  Err(GenerationFailure {
    attempts: max_attempts,
    last_reason: last_failure.map(|e| e.to_string()).unwrap_or_default(),
  })
}

async fn run_attempt(generator: &dyn Generator, prompt: &str) -> Result<Vec<CandidateRecord>, AttemptFailure> {
  let raw = generator.generate(prompt).await?;
  info!(target: "ingest", preview = %trunc_for_log(&raw, 100), "Generation response preview");

  let cleaned = repair(&raw)?;
  let decoded: Value = serde_json::from_str(&cleaned).map_err(|e| AttemptFailure::Decode(e.to_string()))?;
  let items = match decoded {
    Value::Array(items) => items,
    _ => return Err(AttemptFailure::NotAnArray),
  };
  if items.is_empty() {
    return Err(AttemptFailure::EmptyArray);
  }
  Ok(items.into_iter().map(CandidateRecord).collect())
}
