//! 前场核心
//!
//! 实体存储、本地缓存、设备标识、写入网关和派生层

pub mod cache;
pub mod config;
pub mod context;
pub mod derive;
pub mod device;
pub mod error;
pub mod floor;
pub mod flows;
pub mod gateway;
pub mod paths;

pub use cache::{CachePayload, CacheWriter, LocalCache};
pub use config::AppConfig;
pub use context::{AppContext, ContextOptions, LoadStatus};
pub use derive::{CheckBadge, Fill, TableBadges};
pub use error::{AppError, AppResult};
pub use floor::{CheckView, SectionView, TableView};
pub use flows::{AssignOutcome, AssignSheet, MoveConfirmation};
pub use gateway::{PendingWrite, WriteReceipt};
pub use paths::AppPaths;
