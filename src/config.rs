//! Loading service configuration from TOML plus a few env overrides.
//!
//! See `AppConfig` for the expected schema. Every section and key is optional.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::session::{MAX_QUESTIONS, QUESTION_SECONDS};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub quiz: QuizConfig,
  #[serde(default)]
  pub identity: IdentityConfig,
  #[serde(default)]
  pub data: DataConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub port: u16,
  pub static_dir: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self { port: 3000, static_dir: PathBuf::from("./static") }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
  /// Countdown budget per question.
  pub question_seconds: u32,
  /// How many questions are sampled from a category for one quiz (at most 10).
  pub questions_per_quiz: usize,
  /// Default leaderboard size when the caller gives none.
  pub leaderboard_limit: usize,
}

impl Default for QuizConfig {
  fn default() -> Self {
    Self { question_seconds: QUESTION_SECONDS, questions_per_quiz: MAX_QUESTIONS, leaderboard_limit: 20 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
  pub cookie_name: String,
  pub max_age_days: u32,
}

impl Default for IdentityConfig {
  fn default() -> Self {
    Self { cookie_name: "uid".into(), max_age_days: 365 }
  }
}

/// Where default questions come from and where the document store persists.
#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
  pub defaults_url: Option<String>,
  pub defaults_path: Option<PathBuf>,
  pub store_path: Option<PathBuf>,
}

impl AppConfig {
  /// Clamp values the quiz engine cannot honor.
  fn sanitized(mut self) -> Self {
    if self.quiz.questions_per_quiz == 0 || self.quiz.questions_per_quiz > MAX_QUESTIONS {
      warn!(target: "quizbank", requested = self.quiz.questions_per_quiz, max = MAX_QUESTIONS, "questions_per_quiz out of range; clamping");
      self.quiz.questions_per_quiz = self.quiz.questions_per_quiz.clamp(1, MAX_QUESTIONS);
    }
    if self.quiz.question_seconds == 0 {
      warn!(target: "quizbank", default = QUESTION_SECONDS, "question_seconds must be positive; using default");
      self.quiz.question_seconds = QUESTION_SECONDS;
    }
    if self.quiz.leaderboard_limit == 0 {
      self.quiz.leaderboard_limit = 20;
    }
    self
  }

  fn apply_env(mut self) -> Self {
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Ok(url) = std::env::var("QUIZ_DEFAULTS_URL") {
      self.data.defaults_url = Some(url);
    }
    if let Ok(path) = std::env::var("QUIZ_DEFAULTS_PATH") {
      self.data.defaults_path = Some(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var("QUIZ_STORE_PATH") {
      self.data.store_path = Some(PathBuf::from(path));
    }
    self
  }
}

/// Parse a TOML document into a sanitized config.
pub fn parse_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s).map(AppConfig::sanitized)
}

/// Load `AppConfig` from QUIZ_CONFIG_PATH, then apply env overrides.
/// On any parsing/IO error, falls back to defaults.
pub fn load_app_config_from_env() -> AppConfig {
  let from_file = match std::env::var("QUIZ_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match parse_config(&s) {
        Ok(cfg) => {
          info!(target: "quizbank", %path, "Loaded config (TOML)");
          Some(cfg)
        }
        Err(e) => {
          error!(target: "quizbank", %path, error = %e, "Failed to parse TOML config");
          None
        }
      },
      Err(e) => {
        error!(target: "quizbank", %path, error = %e, "Failed to read TOML config file");
        None
      }
    },
    Err(_) => None,
  };
  from_file.unwrap_or_default().apply_env().sanitized()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_yields_defaults() {
    let cfg = parse_config("").unwrap();
    assert_eq!(cfg.server.port, 3000);
    assert_eq!(cfg.quiz.question_seconds, 15);
    assert_eq!(cfg.quiz.questions_per_quiz, 10);
    assert_eq!(cfg.identity.cookie_name, "uid");
    assert_eq!(cfg.identity.max_age_days, 365);
    assert!(cfg.data.defaults_url.is_none());
  }

  #[test]
  fn partial_sections_and_clamping() {
    let cfg = parse_config(
      r#"
      [quiz]
      questions_per_quiz = 25
      question_seconds = 0

      [data]
      store_path = "/tmp/quiz.json"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.quiz.questions_per_quiz, MAX_QUESTIONS);
    assert_eq!(cfg.quiz.question_seconds, 15);
    assert_eq!(cfg.quiz.leaderboard_limit, 20);
    assert_eq!(cfg.data.store_path, Some(PathBuf::from("/tmp/quiz.json")));
  }
}
