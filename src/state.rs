//! Application state: config, identity provider, question bank and score repository.
//!
//! One document store backs both the question bank and the score repository.
//! It is in-memory, optionally persisted to a JSON snapshot (`data.store_path`).

use std::sync::Arc;

use tracing::{info, instrument};

use crate::bank::QuestionBank;
use crate::config::AppConfig;
use crate::defaults::{DefaultQuestions, DefaultsSource};
use crate::identity::IdentityProvider;
use crate::scores::ScoreRepository;
use crate::store::{DocumentStore, MemoryStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub identity: IdentityProvider,
    pub bank: QuestionBank,
    pub scores: ScoreRepository,
}

impl AppState {
    /// Build state from config: open the store and pick the default-questions source.
    #[instrument(level = "info", skip_all)]
    pub async fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn DocumentStore> = match &config.data.store_path {
            Some(path) => Arc::new(MemoryStore::open(path.clone()).await?),
            None => {
                info!(target: "quizbank", "No store_path configured; data lives in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        let defaults = Arc::new(DefaultsSource::from_config(&config.data));
        Ok(Self::with_parts(config, store, defaults))
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        defaults: Arc<dyn DefaultQuestions>,
    ) -> Self {
        Self {
            identity: IdentityProvider::new(&config.identity),
            bank: QuestionBank::new(store.clone(), defaults),
            scores: ScoreRepository::new(store),
            config,
        }
    }
}
