//! Shared types for Tableside
//!
//! Common types used by the sync server, the remote store client and the
//! app core: entity models, the document store wire model, and the unified
//! error types.

pub mod document;
pub mod error;
pub mod models;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use document::{
    Collection, CommitResult, Document, DocumentWrite, FeedEvent, FieldValue, Snapshot, WriteBatch,
};
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use models::{AppState, Check, DiningTable, Section, StatusColor};
