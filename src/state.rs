//! Application state: configuration plus the two explicit collaborators every
//! pipeline call receives (question store, optional generation client).
//!
//! Nothing here is mutated after startup; the store owns its own locking.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_service_config_from_env, ServiceConfig};
use crate::generation::{GenerationClient, Generator};
use crate::store::{MemoryStore, QuestionStore};

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub store: Arc<dyn QuestionStore>,
    pub generator: Option<Arc<dyn Generator>>,
}

impl AppState {
    /// Build state from env: load config, init the generation client, start an empty store.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let config = load_service_config_from_env();

        let generator: Option<Arc<dyn Generator>> = match GenerationClient::from_env(&config.generation) {
            Some(client) => {
                info!(target: "quizsmith_backend", base_url = %client.base_url, model = %client.model, "Generation enabled.");
                Some(Arc::new(client))
            }
            None => {
                info!(target: "quizsmith_backend", "Generation disabled (no GENERATION_API_KEY). Subjective answers use keyword scoring.");
                None
            }
        };

        Self::new(config, Arc::new(MemoryStore::new()), generator)
    }

    pub fn new(config: ServiceConfig, store: Arc<dyn QuestionStore>, generator: Option<Arc<dyn Generator>>) -> Self {
        Self { config, store, generator }
    }

    pub fn generator(&self) -> Option<&dyn Generator> {
        self.generator.as_deref()
    }
}
