//! Client error types

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server rejected the request
    #[error("{message} (code {code})")]
    Api { code: ErrorCode, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        ClientError::Api {
            code: err.code,
            message: err.message,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
