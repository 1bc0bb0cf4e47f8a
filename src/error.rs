//! API error type and its JSON wire representation.
//!
//! Every failure leaves the server as
//! `{"error": {"code": "MEMORY_NOT_FOUND", "message": "..."}}` so that
//! clients can branch on the stable `code` instead of parsing messages.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Memory not found: {0}")]
    MemoryNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Prediction not found: {0}")]
    PredictionNotFound(String),

    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("Rate limit exceeded, slow down")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MemoryNotFound(_) => "MEMORY_NOT_FOUND",
            Self::AgentNotFound(_) => "AGENT_NOT_FOUND",
            Self::PredictionNotFound(_) => "PREDICTION_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::RateLimited => "RATE_LIMITED",
            Self::Timeout => "REQUEST_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MemoryNotFound(_) | Self::AgentNotFound(_) | Self::PredictionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                tracing::error!(name: "api.internal_error", error = ?e, "Request failed");
                "Internal server error".to_string()
            }
            other => {
                tracing::debug!(name: "api.error", code = other.code(), error = %other, "Request rejected");
                other.to_string()
            }
        };
        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_variants_share_status_but_not_code() {
        let memory = ApiError::MemoryNotFound("mem_1".into());
        let agent = ApiError::AgentNotFound("a".into());
        assert_eq!(memory.status(), StatusCode::NOT_FOUND);
        assert_eq!(agent.status(), StatusCode::NOT_FOUND);
        assert_eq!(memory.code(), "MEMORY_NOT_FOUND");
        assert_eq!(agent.code(), "AGENT_NOT_FOUND");
    }

    #[test]
    fn internal_errors_map_to_500() {
        let err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }
}
