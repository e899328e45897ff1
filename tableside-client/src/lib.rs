//! Tableside Client - 文档存储客户端
//!
//! 前场设备与 sync-server 之间的唯一接口：
//!
//! - [`RemoteStore`] - 提交原子批次、订阅集合快照
//! - [`HttpRemoteStore`] - HTTP + SSE 网络实现
//! - `LocalRemoteStore` - 进程内实现 (需要 `in-process` feature)

pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "in-process")]
pub mod local;
pub mod remote;
mod sse;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpRemoteStore;
#[cfg(feature = "in-process")]
pub use local::LocalRemoteStore;
pub use remote::{FeedSender, FeedSubscription, RemoteStore};

// Re-export shared types for convenience
pub use shared::document::{Collection, CommitResult, FeedEvent, Snapshot, WriteBatch};
