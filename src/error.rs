//! Error taxonomy for the quiz core and its mapping to HTTP responses.
//!
//! Every store-facing operation returns `Result<_, QuizError>`; each variant maps
//! to its own status code and user-facing message at the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum QuizError {
    /// Bad caller input. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("default questions unavailable for '{category}': {reason}")]
    SeedDataMissing { category: String, reason: String },

    #[error("failed to save initial questions: {0}")]
    SeedWriteFailed(String),

    #[error("no valid questions with ids found to update")]
    NoValidEntries,

    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    /// A quiz was started with no usable questions.
    #[error("quiz has no questions to play")]
    LoadError,
}

impl QuizError {
    pub fn kind(&self) -> &'static str {
        match self {
            QuizError::InvalidArgument(_) => "invalid_argument",
            QuizError::SeedDataMissing { .. } => "seed_data_missing",
            QuizError::SeedWriteFailed(_) => "seed_write_failed",
            QuizError::NoValidEntries => "no_valid_entries",
            QuizError::StoreUnavailable(_) => "store_unavailable",
            QuizError::LoadError => "load_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            QuizError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            QuizError::SeedDataMissing { .. } => StatusCode::NOT_FOUND,
            QuizError::NoValidEntries | QuizError::LoadError => StatusCode::UNPROCESSABLE_ENTITY,
            QuizError::SeedWriteFailed(_) | QuizError::StoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Message shown to the player/admin. Store details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            QuizError::InvalidArgument(msg) => msg.clone(),
            QuizError::SeedDataMissing { category, .. } => {
                format!("No questions are available for '{}' yet.", category)
            }
            QuizError::SeedWriteFailed(_) => {
                "Failed to save initial questions to your account. Please try again later.".into()
            }
            QuizError::NoValidEntries => "No valid questions with IDs found to update.".into(),
            QuizError::StoreUnavailable(_) => {
                "Could not reach the question store. Please check your connection and try again.".into()
            }
            QuizError::LoadError => {
                "Could not load the quiz questions. Please select a category again.".into()
            }
        }
    }
}

impl From<StoreError> for QuizError {
    fn from(e: StoreError) -> Self {
        QuizError::StoreUnavailable(e.to_string())
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.kind(), "message": self.user_message() });
        (self.status(), Json(body)).into_response()
    }
}
