//! The static default question dataset used for lazy seeding.
//!
//! The dataset is a JSON object mapping category name → list of question-shaped
//! records. It is loaded raw so the synchronizer can tell "missing / not a list"
//! apart from "empty list".

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::DataConfig;

/// Built-in dataset, used when no URL or file is configured.
const EMBEDDED_DEFAULTS: &str = include_str!("../data/init-data.json");

#[derive(Error, Debug)]
pub enum DefaultsError {
  #[error("failed to read {path}: {source}")]
  Io { path: String, source: std::io::Error },

  #[error("failed to fetch default questions: {0}")]
  Http(#[from] reqwest::Error),

  #[error("default questions are not valid JSON: {0}")]
  Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait DefaultQuestions: Send + Sync {
  /// Fetch the whole dataset. Called once per cold seed.
  async fn load(&self) -> Result<Value, DefaultsError>;
}

pub enum DefaultsSource {
  Remote { client: reqwest::Client, url: String },
  File(PathBuf),
  Embedded,
}

impl DefaultsSource {
  /// URL wins over file; the embedded dataset is the last resort.
  pub fn from_config(cfg: &DataConfig) -> Self {
    if let Some(url) = &cfg.defaults_url {
      info!(target: "bank", %url, "Default questions: remote");
      DefaultsSource::Remote { client: reqwest::Client::new(), url: url.clone() }
    } else if let Some(path) = &cfg.defaults_path {
      info!(target: "bank", path = %path.display(), "Default questions: file");
      DefaultsSource::File(path.clone())
    } else {
      info!(target: "bank", "Default questions: embedded dataset");
      DefaultsSource::Embedded
    }
  }
}

#[async_trait]
impl DefaultQuestions for DefaultsSource {
  #[instrument(level = "debug", skip(self))]
  async fn load(&self) -> Result<Value, DefaultsError> {
    match self {
      DefaultsSource::Remote { client, url } => {
        let value = client.get(url).send().await?.error_for_status()?.json::<Value>().await?;
        Ok(value)
      }
      DefaultsSource::File(path) => {
        let bytes = tokio::fs::read(path).await.map_err(|source| DefaultsError::Io {
          path: path.display().to_string(),
          source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
      }
      DefaultsSource::Embedded => Ok(serde_json::from_str(EMBEDDED_DEFAULTS)?),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn embedded_dataset_is_well_formed() {
    let data = DefaultsSource::Embedded.load().await.unwrap();
    let obj = data.as_object().unwrap();
    assert!(obj.contains_key("Web Development"));
    for (category, entries) in obj {
      for entry in entries.as_array().unwrap() {
        let answer = entry["answer"].as_str().unwrap();
        let choices = entry["choices"].as_array().unwrap();
        assert_eq!(choices.len(), 4, "{category}");
        assert!(choices.iter().any(|c| c == answer), "{category}: {answer}");
        assert!(!entry["id"].as_str().unwrap().is_empty());
      }
    }
  }

  #[tokio::test]
  async fn missing_file_is_an_io_error() {
    let src = DefaultsSource::File(PathBuf::from("/nonexistent/init-data.json"));
    assert!(matches!(src.load().await, Err(DefaultsError::Io { .. })));
  }

  #[test]
  fn url_takes_priority() {
    let cfg = DataConfig {
      defaults_url: Some("http://localhost:9/init-data.json".into()),
      defaults_path: Some(PathBuf::from("init-data.json")),
      store_path: None,
    };
    assert!(matches!(DefaultsSource::from_config(&cfg), DefaultsSource::Remote { .. }));
    assert!(matches!(DefaultsSource::from_config(&DataConfig::default()), DefaultsSource::Embedded));
  }
}
