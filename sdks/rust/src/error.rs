//! Error types for the SDK.

use thiserror::Error;

/// SDK error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    #[cfg(feature = "http-client")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The service answered with an error body.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable code such as `MEMORY_NOT_FOUND`.
        code: Option<String>,
        /// Error message from the API.
        message: String,
    },

    /// Missing or invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Runtime error (embedded mode).
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// The service error code, when the failure came from the API.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status, when the failure came from the API.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;
