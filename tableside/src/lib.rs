//! Tableside - 餐厅前场协调
//!
//! 前场设备 (平板/手机) 共享同一份账单与桌台状态：
//!
//! - **实体存储** (`core::context`): checks / tables 两个集合的实时快照
//! - **写入网关** (`core::gateway`): 乐观更新 + 按序提交的合并写入
//! - **派生层** (`core::derive`, `core::floor`): 有效颜色、桌台标签、楼面视图
//! - **本地缓存** (`core::cache`): 冷启动时先显示上次的快照
//!
//! 远程存储可以是 sync-server (HTTP/SSE)，也可以是进程内的文档存储。

pub mod core;
pub mod logging;

pub use core::{
    AppConfig, AppContext, AppError, AppPaths, AppResult, AssignOutcome, AssignSheet,
    ContextOptions, LoadStatus, MoveConfirmation, PendingWrite, WriteReceipt,
};

pub use shared;
pub use tableside_client;

use std::sync::Arc;

use sync_server::{DocumentStore, Persistence};
use tableside_client::{HttpRemoteStore, LocalRemoteStore, RemoteStore};

/// 进程内文档存储的广播容量
const LOCAL_FEED_CAPACITY: usize = 64;

/// 连接远程存储: sync-server 或进程内文档存储 (持久化到工作目录)
pub async fn connect_remote(
    paths: &AppPaths,
    config: &AppConfig,
    in_process: bool,
) -> AppResult<Arc<dyn RemoteStore>> {
    if in_process {
        let persistence = Persistence::new(paths.local_store_file());
        tracing::info!(path = %persistence.path().display(), "Using in-process document store");
        let store = DocumentStore::open(LOCAL_FEED_CAPACITY, persistence).await;
        return Ok(Arc::new(LocalRemoteStore::new(store)));
    }
    tracing::info!(server_url = %config.server_url, "Using sync-server");
    let remote = HttpRemoteStore::new(config.client_config())?;
    Ok(Arc::new(remote))
}

/// 启动实体存储: 设备标识、本地缓存、订阅
pub async fn start_context(paths: &AppPaths, remote: Arc<dyn RemoteStore>) -> AppContext {
    let device_id = core::device::load_or_create(&paths.device_id_file());
    let options = ContextOptions {
        cache: core::LocalCache::new(paths.cache_file()),
        device_id,
    };
    AppContext::start(remote, options).await
}
