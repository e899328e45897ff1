//! Core error types

use thiserror::Error;

/// 前场核心错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Remote store error: {0}")]
    Client(#[from] tableside_client::ClientError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Check not found: {0}")]
    CheckNotFound(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Write queue closed")]
    WriteQueueClosed,

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
