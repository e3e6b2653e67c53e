//! Generation client: the single boundary to the upstream chat-completions service.
//!
//! One prompt in, raw text out. No retries live here; the orchestrator owns them.
//! Calls log model names, latencies and response sizes (not contents), and never the API key.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::GenerationSettings;
use crate::error::GenerationError;

/// Anything that turns a prompt into raw (untrusted) text.
#[async_trait]
pub trait Generator: Send + Sync {
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Clone)]
pub struct GenerationClient {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  temperature: f32,
  max_tokens: u32,
}

impl GenerationClient {
  /// Construct the client if GENERATION_API_KEY is set; otherwise return None.
  pub fn from_env(settings: &GenerationSettings) -> Option<Self> {
    let api_key = std::env::var("GENERATION_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    match Self::new(settings, api_key) {
      Ok(c) => Some(c),
      Err(e) => {
        error!(target: "quizsmith_backend", error = %e, "Failed to build HTTP client for generation");
        None
      }
    }
  }

  pub fn new(settings: &GenerationSettings, api_key: String) -> Result<Self, GenerationError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout())
      .build()
      .map_err(|e| GenerationError::Transport(e.to_string()))?;

    Ok(Self {
      client,
      api_key,
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      model: settings.model.clone(),
      temperature: settings.temperature,
      max_tokens: settings.max_tokens,
    })
  }
}

#[async_trait]
impl Generator for GenerationClient {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![ChatMessageReq { role: "user".into(), content: prompt.into() }],
      temperature: self.temperature,
      max_tokens: Some(self.max_tokens),
    };

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "quizsmith-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(transport_error)?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      return Err(GenerationError::Status { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| GenerationError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Generation usage");
    }
    let text = body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .ok_or(GenerationError::EmptyContent)?;

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Generation response received");
    Ok(text)
  }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
  if e.is_timeout() {
    GenerationError::Timeout
  } else {
    GenerationError::Transport(e.to_string())
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
