//! Loading service configuration (prompts + generation/ingestion/evaluation knobs) from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! Secrets never live in the file: the generation API key is read from
//! GENERATION_API_KEY by the client itself.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
  pub prompts: Prompts,
  pub generation: GenerationSettings,
  pub ingestion: IngestionSettings,
  pub evaluation: EvaluationSettings,
}

/// Upstream chat-completions endpoint settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
  pub timeout_secs: u64,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      base_url: "https://api.groq.com/openai/v1".into(),
      model: "llama3-70b-8192".into(),
      temperature: 0.7,
      max_tokens: 1800,
      timeout_secs: 30,
    }
  }
}

impl GenerationSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  /// GENERATION_BASE_URL / GENERATION_MODEL override whatever the file says.
  fn apply_env(&mut self) {
    if let Ok(url) = std::env::var("GENERATION_BASE_URL") {
      self.base_url = url;
    }
    if let Ok(model) = std::env::var("GENERATION_MODEL") {
      self.model = model;
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
  /// Generation attempts per batch before giving up.
  pub max_attempts: usize,
  /// How many recent stored questions to look up for the avoid list.
  pub recent_window: usize,
  /// How many of those actually go into the prompt.
  pub avoid_limit: usize,
}

impl Default for IngestionSettings {
  fn default() -> Self {
    Self { max_attempts: 3, recent_window: 15, avoid_limit: 5 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
  /// Minimum score for an answer to count as correct in quiz results.
  pub pass_threshold: f64,
}

impl Default for EvaluationSettings {
  fn default() -> Self {
    Self { pass_threshold: 0.7 }
  }
}

/// Prompt templates. Placeholders use `{name}` and are filled by `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Question generation
  pub generation_intro_template: String,
  pub managerial_suffix_template: String,
  pub avoid_header: String,
  pub mcq_format: String,
  pub subjective_format: String,
  // Answer evaluation
  pub evaluation_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_intro_template: "Generate exactly {count} unique {kind} about '{topic}' at {difficulty} level for {skill} skills".into(),
      managerial_suffix_template: " for managerial level '{level}'".into(),
      avoid_header: "AVOID these existing questions (create completely different ones):".into(),
      mcq_format: r#"CRITICAL: Return ONLY a valid JSON array. No explanations, no markdown, no extra text.

Format (EXACTLY like this):
[
  {
    "type": "mcq",
    "question": "Your question here?",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "answer": "Option A"
  }
]

Requirements:
- Exactly 4 options for each question
- Answer must be exactly one of the options
- No trailing commas
- Double quotes only
- Each question must be unique and complete"#.into(),
      subjective_format: r#"CRITICAL: Return ONLY a valid JSON array. No explanations, no markdown, no extra text.

Format (EXACTLY like this):
[
  {
    "type": "subjective",
    "question": "Your detailed question here?",
    "answer": "Comprehensive model answer here"
  }
]

Requirements:
- Questions should require detailed answers
- Model answers should be comprehensive
- No trailing commas
- Double quotes only
- Each question must be unique"#.into(),
      evaluation_template: r#"You are an expert evaluator. Evaluate the user's answer to the following question:

Question: {question}

Correct Answer: {reference}

User's Answer: {answer}

Please evaluate the user's answer and provide:
1. A score between 0.0 and 1.0 (where 1.0 is perfect, 0.8-0.9 is very good, 0.6-0.7 is good, 0.4-0.5 is fair, 0.2-0.3 is poor, 0.0-0.1 is very poor)
2. Brief feedback explaining the score

Consider:
- Accuracy of key concepts
- Completeness of the answer
- Understanding demonstrated
- Relevant details included

Return ONLY a JSON object in this exact format:
{"score": 0.8, "feedback": "Your feedback here explaining the score and what was good/missing"}

No explanations, just the JSON object."#.into(),
    }
  }
}

/// Load `ServiceConfig` from QUIZ_CONFIG_PATH, falling back to defaults on any IO/parse error.
/// Environment overrides for the generation endpoint are applied either way.
pub fn load_service_config_from_env() -> ServiceConfig {
  let mut cfg = match std::env::var("QUIZ_CONFIG_PATH") {
    Ok(path) => load_from_path(&path).unwrap_or_default(),
    Err(_) => ServiceConfig::default(),
  };
  cfg.generation.apply_env();
  cfg
}

fn load_from_path(path: &str) -> Option<ServiceConfig> {
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<ServiceConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizsmith_backend", %path, "Loaded service config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizsmith_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizsmith_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
