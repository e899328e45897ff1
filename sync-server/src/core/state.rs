//! 服务器状态
//!
//! 所有 handler 共享的状态，克隆开销为引用计数

use std::sync::Arc;
use std::time::Instant;

use crate::core::Config;
use crate::store::{DocumentStore, Persistence};

/// 服务器共享状态
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 配置
    pub config: Arc<Config>,
    /// 文档存储
    pub store: DocumentStore,
    /// 本次进程实例 ID (客户端可据此识别服务器重启)
    pub epoch: String,
    /// 启动时间
    pub started_at: Instant,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 配置了 `DATA_FILE` 时从文件加载已有文档
    pub async fn initialize(config: &Config) -> Self {
        let store = match &config.data_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Opening persistent document store");
                DocumentStore::open(config.feed_channel_capacity, Persistence::new(path)).await
            }
            None => {
                tracing::info!("Using in-memory document store");
                DocumentStore::new(config.feed_channel_capacity)
            }
        };
        Self::with_store(config.clone(), store)
    }

    /// 使用现有存储创建状态 (测试和进程内嵌入)
    pub fn with_store(config: Config, store: DocumentStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
            epoch: uuid::Uuid::new_v4().to_string(),
            started_at: Instant::now(),
        }
    }

    /// 运行时间 (秒)
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
