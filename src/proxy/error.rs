//! Error taxonomy of the AI routes and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::provider::ProviderError;

pub const MISSING_API_KEY_MESSAGE: &str = "Missing OpenAI API key.";
pub const REQUEST_FAILED_MESSAGE: &str = "Failed to process AI request";
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

#[derive(Debug, thiserror::Error)]
pub enum AssistError {
    /// Neither the request nor the process environment supplied an API key
    #[error("{}", MISSING_API_KEY_MESSAGE)]
    MissingApiKey,

    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    /// The caller went away before the single-shot completion finished
    #[error("request cancelled by caller")]
    Cancelled,

    #[error("upstream failure: {0}")]
    Upstream(#[from] ProviderError),
}

impl AssistError {
    pub fn status(&self) -> StatusCode {
        match self {
            AssistError::MissingApiKey => StatusCode::UNAUTHORIZED,
            AssistError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AssistError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            AssistError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Provider detail stays in the logs; callers only see the fixed messages.
impl IntoResponse for AssistError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AssistError::MissingApiKey => {
                (status, Json(json!({ "error": MISSING_API_KEY_MESSAGE }))).into_response()
            }
            AssistError::InvalidRequest(_) => {
                (status, Json(json!({ "error": INVALID_BODY_MESSAGE }))).into_response()
            }
            AssistError::Cancelled => status.into_response(),
            AssistError::Upstream(_) => {
                (status, Json(json!({ "error": REQUEST_FAILED_MESSAGE }))).into_response()
            }
        }
    }
}
