//! Domain models: request metadata enums, candidate records decoded from model
//! output, validated questions, and evaluation outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Rejection;

/// Which kind of question a batch holds.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  #[default]
  Mcq,
  Subjective,
}

impl QuestionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      QuestionType::Mcq => "mcq",
      QuestionType::Subjective => "subjective",
    }
  }
}

impl std::fmt::Display for QuestionType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Novice,
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Novice => "novice",
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkillType {
  Technical,
  SoftSkill,
}

impl SkillType {
  pub fn as_str(&self) -> &'static str {
    match self {
      SkillType::Technical => "technical",
      SkillType::SoftSkill => "soft_skill",
    }
  }

  /// Human wording used inside prompts ("soft skill" rather than "soft_skill").
  pub fn label(&self) -> &'static str {
    match self {
      SkillType::Technical => "technical",
      SkillType::SoftSkill => "soft skill",
    }
  }
}

/// Decoded but unvalidated item from generation output.
///
/// Kept as raw JSON: the model decides which fields show up, the validator decides
/// which of them are acceptable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CandidateRecord(pub Value);

impl CandidateRecord {
  pub fn is_object(&self) -> bool {
    self.0.is_object()
  }

  pub fn question(&self) -> Option<&str> {
    self.0.get("question").and_then(Value::as_str)
  }

  pub fn options(&self) -> Option<&Vec<Value>> {
    self.0.get("options").and_then(Value::as_array)
  }

  /// The `answer` field as text. Numbers and booleans are stringified, since models
  /// occasionally emit `"answer": 4` for a numeric option.
  pub fn answer(&self) -> Option<String> {
    match self.0.get("answer")? {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      Value::Bool(b) => Some(b.to_string()),
      _ => None,
    }
  }
}

/// Multiple-choice question: exactly four distinct options, one of them correct.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct McqQuestion {
  text: String,
  options: [String; 4],
  correct_option: String,
}

impl McqQuestion {
  pub fn try_new(text: &str, options: Vec<String>, correct_option: &str) -> Result<Self, Rejection> {
    let text = checked_text(text)?;
    let options: [String; 4] = options
      .try_into()
      .map_err(|v: Vec<String>| Rejection::WrongOptionCount(v.len()))?;
    for (i, opt) in options.iter().enumerate() {
      if options[..i].contains(opt) {
        return Err(Rejection::DuplicateOption(opt.clone()));
      }
    }
    let correct_option = correct_option.trim();
    if !options.iter().any(|o| o == correct_option) {
      return Err(Rejection::AnswerNotInOptions(correct_option.to_string()));
    }
    Ok(Self { text, options, correct_option: correct_option.to_string() })
  }

  pub fn text(&self) -> &str { &self.text }
  pub fn options(&self) -> &[String; 4] { &self.options }
  pub fn correct_option(&self) -> &str { &self.correct_option }
}

/// Free-text question scored against a reference answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectiveQuestion {
  text: String,
  reference_answer: String,
}

impl SubjectiveQuestion {
  pub fn try_new(text: &str, reference_answer: &str) -> Result<Self, Rejection> {
    let text = checked_text(text)?;
    let reference_answer = reference_answer.trim();
    if reference_answer.is_empty() {
      return Err(Rejection::EmptyAnswer);
    }
    Ok(Self { text, reference_answer: reference_answer.to_string() })
  }

  pub fn text(&self) -> &str { &self.text }
  pub fn reference_answer(&self) -> &str { &self.reference_answer }
}

pub const MIN_QUESTION_CHARS: usize = 8;

fn checked_text(text: &str) -> Result<String, Rejection> {
  let text = text.trim();
  if text.is_empty() {
    return Err(Rejection::MissingQuestion);
  }
  let len = text.chars().count();
  if len < MIN_QUESTION_CHARS {
    return Err(Rejection::QuestionTooShort(len));
  }
  Ok(text.to_string())
}

/// Structurally and semantically accepted question. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidatedQuestion {
  Mcq(McqQuestion),
  Subjective(SubjectiveQuestion),
}

impl ValidatedQuestion {
  pub fn text(&self) -> &str {
    match self {
      ValidatedQuestion::Mcq(q) => q.text(),
      ValidatedQuestion::Subjective(q) => q.text(),
    }
  }

  pub fn question_type(&self) -> QuestionType {
    match self {
      ValidatedQuestion::Mcq(_) => QuestionType::Mcq,
      ValidatedQuestion::Subjective(_) => QuestionType::Subjective,
    }
  }

  /// What the user is expected to answer: the correct option or the reference answer.
  pub fn expected_answer(&self) -> &str {
    match self {
      ValidatedQuestion::Mcq(q) => q.correct_option(),
      ValidatedQuestion::Subjective(q) => q.reference_answer(),
    }
  }

  pub fn options(&self) -> Option<&[String; 4]> {
    match self {
      ValidatedQuestion::Mcq(q) => Some(q.options()),
      ValidatedQuestion::Subjective(_) => None,
    }
  }
}

/// Back to the candidate shape the model produces, so validation can be re-applied.
impl From<&ValidatedQuestion> for CandidateRecord {
  fn from(q: &ValidatedQuestion) -> Self {
    match q {
      ValidatedQuestion::Mcq(m) => CandidateRecord(serde_json::json!({
        "type": "mcq",
        "question": m.text(),
        "options": m.options(),
        "answer": m.correct_option(),
      })),
      ValidatedQuestion::Subjective(s) => CandidateRecord(serde_json::json!({
        "type": "subjective",
        "question": s.text(),
        "answer": s.reference_answer(),
      })),
    }
  }
}

/// Which strategy produced a score.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMethod {
  ExactMatch,
  GenerationScored,
  KeywordFallback,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvaluationOutcome {
  /// Always within [0.0, 1.0].
  pub score: f64,
  pub feedback: String,
  pub method: EvaluationMethod,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn opts(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn mcq_requires_four_distinct_options() {
    let err = McqQuestion::try_new("Capital of France?", opts(&["Paris", "Rome", "Oslo"]), "Paris").unwrap_err();
    assert_eq!(err, Rejection::WrongOptionCount(3));

    let err = McqQuestion::try_new("Capital of France?", opts(&["Paris", "Rome", "Paris", "Oslo"]), "Paris").unwrap_err();
    assert_eq!(err, Rejection::DuplicateOption("Paris".into()));
  }

  #[test]
  fn mcq_answer_must_match_exactly() {
    let err = McqQuestion::try_new("Capital of France?", opts(&["Paris", "Rome", "Oslo", "Bern"]), "paris").unwrap_err();
    assert_eq!(err, Rejection::AnswerNotInOptions("paris".into()));

    let q = McqQuestion::try_new("  Capital of France?  ", opts(&["Paris", "Rome", "Oslo", "Bern"]), " Paris ").unwrap();
    assert_eq!(q.text(), "Capital of France?");
    assert_eq!(q.correct_option(), "Paris");
  }

  #[test]
  fn question_text_needs_eight_chars() {
    assert_eq!(SubjectiveQuestion::try_new("  Why? ", "Because").unwrap_err(), Rejection::QuestionTooShort(4));
    assert_eq!(SubjectiveQuestion::try_new("   ", "Because").unwrap_err(), Rejection::MissingQuestion);
    assert_eq!(SubjectiveQuestion::try_new("Explain ownership", "  ").unwrap_err(), Rejection::EmptyAnswer);
  }

  #[test]
  fn validated_question_serializes_with_type_tag() {
    let q = ValidatedQuestion::Subjective(SubjectiveQuestion::try_new("Explain borrowing", "Shared refs").unwrap());
    let v = serde_json::to_value(&q).unwrap();
    assert_eq!(v["type"], "subjective");
    assert_eq!(v["reference_answer"], "Shared refs");
  }

  #[test]
  fn candidate_answer_stringifies_numbers() {
    let c = CandidateRecord(serde_json::json!({"question": "2 + 2 equals?", "answer": 4}));
    assert_eq!(c.answer().as_deref(), Some("4"));
  }
}
