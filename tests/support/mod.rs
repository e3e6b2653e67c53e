#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quizsmith_backend::config::ServiceConfig;
use quizsmith_backend::error::GenerationError;
use quizsmith_backend::generation::Generator;
use quizsmith_backend::state::AppState;
use quizsmith_backend::store::MemoryStore;

/// Replays canned replies in order; the last one repeats once the script runs out.
pub struct ScriptedGenerator {
    replies: Vec<Result<String, GenerationError>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");
        Self { replies, prompts: Mutex::new(Vec::new()) }
    }

    pub fn ok(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut prompts = self.prompts.lock().unwrap();
        let idx = prompts.len().min(self.replies.len() - 1);
        prompts.push(prompt.to_string());
        self.replies[idx].clone()
    }
}

/// Every call fails like an unreachable upstream.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Transport("connection refused".into()))
    }
}

pub fn state_with(generator: Option<Arc<dyn Generator>>) -> AppState {
    AppState::new(ServiceConfig::default(), Arc::new(MemoryStore::new()), generator)
}

pub const FIVE_MCQ_WITH_TWO_BAD: &str = r#"```json
[
  {"type":"mcq","question":"What is 2+2 in base ten?","options":["3","4","5","6"],"answer":"4"},
  {"type":"mcq","question":"Which planet is the red one?","options":["Mars","Venus","Earth"],"answer":"Mars"},
  {"type":"mcq","question":"Which gas do plants absorb?","options":["O2","CO2","N2","H2"],"answer":"Helium"},
  {"type":"mcq","question":"What is the capital of France?","options":["Paris","Rome","Oslo","Bern"],"answer":"Paris"},
  {"type":"mcq","question":"Which language has a borrow checker?","options":["Go","Rust","Java","Ruby"],"answer":"Rust",},
]
```"#;

pub const TWO_SUBJECTIVE: &str = r#"Here are your questions:
[
  {"type":"subjective","question":"Explain what the mitochondria does.","answer":"the mitochondria is the powerhouse of the cell"},
  {"type":"subjective","question":"Describe ownership in Rust.","answer":"each value has a single owner"}
]
Hope this helps!"#;

pub const WRAPPED_MCQ: &str = r#"{"questions": [
  {"question":"What is the capital of France?","options":["Paris","Rome","Oslo","Bern"],"answer":"Paris"},
  {"question":"What is the capital of Norway?","options":["Paris","Rome","Oslo","Bern"],"answer":"Oslo"}
]}"#;
