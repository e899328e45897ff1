//! Data models
//!
//! Shared between sync-server, tableside-client and the tableside app.
//! Serialized field names match the remote document fields (camelCase).

pub mod app_state;
pub mod check;
pub mod dining_table;
mod lenient;
pub mod section;
pub mod status_color;

// Re-exports
pub use app_state::*;
pub use check::*;
pub use dining_table::*;
pub use section::*;
pub use status_color::*;
