//! Prompt assembly for question generation and answer scoring.

use crate::config::Prompts;
use crate::domain::QuestionType;
use crate::protocol::QuestionBatchRequest;
use crate::util::fill_template;

/// Generation prompt: intro sentence, optional avoid list, then the strict format block
/// for the requested question type. At most `avoid_limit` prior questions are listed.
pub fn build_generation_prompt(
  prompts: &Prompts,
  req: &QuestionBatchRequest,
  avoid: &[String],
  avoid_limit: usize,
) -> String {
  let count = req.num_questions.to_string();
  let kind = match req.question_type {
    QuestionType::Mcq => "multiple choice questions",
    QuestionType::Subjective => "subjective questions",
  };
  let mut prompt = fill_template(
    &prompts.generation_intro_template,
    &[
      ("count", &count),
      ("kind", kind),
      ("topic", &req.topic),
      ("difficulty", req.difficulty.as_str()),
      ("skill", req.skill_type.label()),
    ],
  );

  if let Some(level) = req.managerial_level.as_deref().filter(|l| !l.trim().is_empty()) {
    prompt.push_str(&fill_template(&prompts.managerial_suffix_template, &[("level", level)]));
  }
  prompt.push_str(".\n\n");

  if !avoid.is_empty() && avoid_limit > 0 {
    prompt.push_str(&prompts.avoid_header);
    prompt.push('\n');
    for (idx, q) in avoid.iter().take(avoid_limit).enumerate() {
      prompt.push_str(&format!("{}. {}\n", idx + 1, q));
    }
    prompt.push('\n');
  }

  prompt.push_str(match req.question_type {
    QuestionType::Mcq => &prompts.mcq_format,
    QuestionType::Subjective => &prompts.subjective_format,
  });
  prompt
}

pub fn build_evaluation_prompt(prompts: &Prompts, question: &str, reference: &str, answer: &str) -> String {
  fill_template(
    &prompts.evaluation_template,
    &[("question", question), ("reference", reference), ("answer", answer)],
  )
}
