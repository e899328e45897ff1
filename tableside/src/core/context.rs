//! AppContext - 前场设备的实体存储
//!
//! # 数据流
//!
//! ```text
//!  LocalCache ──hydrate──▶ ┌────────────────────┐ ◀──snapshot── checks feed
//!                          │ RwLock<AppState>   │ ◀──snapshot── tables feed
//!  CacheWriter ◀──persist─ │ LoadStatus         │ ◀──optimistic─ gateway
//!                          └─────────┬──────────┘
//!                                    │ revision (watch)
//!                                    ▼
//!                               front ends
//! ```
//!
//! - 每个快照 (初始或增量) 整体替换对应集合，没有合并逻辑
//! - 订阅出错后记录错误并标记该集合已加载，不重试
//! - 两个集合都加载完成且都为空时，执行一次自动初始化
//! - 缓存加载完成后，每次状态变化都写回缓存

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use shared::document::{Collection, FeedEvent, Snapshot};
use shared::models::{AppState, Check, DiningTable};
use tableside_client::RemoteStore;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::cache::{CachePayload, CacheWriter, LocalCache};
use super::error::{AppError, AppResult};
use super::gateway::{self, QueuedWrite};

/// 启动参数
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub cache: LocalCache,
    pub device_id: String,
}

/// 加载状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatus {
    pub checks_loaded: bool,
    pub tables_loaded: bool,
    /// 订阅或自动初始化的错误，重启前一直保留
    pub error: Option<String>,
    /// 自动初始化进行中
    pub seeding: bool,
    /// 缓存已加载 (此后的状态变化才会写回缓存)
    pub hydrated: bool,
}

impl LoadStatus {
    /// 有错误时为 false，否则直到两个集合都加载完成
    pub fn loading(&self) -> bool {
        if self.error.is_some() {
            return false;
        }
        !(self.checks_loaded && self.tables_loaded)
    }

    pub fn is_loaded(&self, collection: Collection) -> bool {
        match collection {
            Collection::Checks => self.checks_loaded,
            Collection::Tables => self.tables_loaded,
        }
    }

    fn mark_loaded(&mut self, collection: Collection) {
        match collection {
            Collection::Checks => self.checks_loaded = true,
            Collection::Tables => self.tables_loaded = true,
        }
    }
}

struct Shared {
    state: RwLock<AppState>,
    status: RwLock<LoadStatus>,
    did_auto_seed: AtomicBool,
    revision: watch::Sender<u64>,
    cache: CacheWriter,
    writes: mpsc::UnboundedSender<QueuedWrite>,
    device_id: String,
    cancel: CancellationToken,
}

/// 实体存储句柄
///
/// 克隆开销为引用计数；所有克隆共享同一份状态
#[derive(Clone)]
pub struct AppContext {
    shared: Arc<Shared>,
    remote: Arc<dyn RemoteStore>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("device_id", &self.shared.device_id)
            .field("revision", &*self.shared.revision.borrow())
            .field("status", &*self.shared.status.read())
            .finish()
    }
}

impl AppContext {
    /// 启动实体存储
    ///
    /// 先从缓存加载，再启动两个集合的订阅；返回时订阅可能尚未送达任何快照
    pub async fn start(remote: Arc<dyn RemoteStore>, options: ContextOptions) -> Self {
        let mut state = AppState::default();
        match options.cache.read().await {
            Some(payload) => {
                hydrate(&mut state, payload);
                tracing::info!(
                    checks = state.checks.len(),
                    tables = state.tables.len(),
                    "Hydrated from local cache"
                );
            }
            None => tracing::debug!("No local cache, starting from defaults"),
        }

        let cancel = CancellationToken::new();
        let cache = CacheWriter::spawn(options.cache, cancel.clone());
        let writes = gateway::spawn_commit_worker(remote.clone());
        let (revision, _) = watch::channel(0u64);

        let ctx = Self {
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                status: RwLock::new(LoadStatus {
                    hydrated: true,
                    ..Default::default()
                }),
                did_auto_seed: AtomicBool::new(false),
                revision,
                cache,
                writes,
                device_id: options.device_id,
                cancel,
            }),
            remote,
        };

        for collection in Collection::ALL {
            ctx.spawn_feed(collection);
        }
        ctx
    }

    // ========== Feed ==========

    fn spawn_feed(&self, collection: Collection) {
        let ctx = self.clone();
        let cancel = self.shared.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(collection = %collection, "Feed stopped");
                }
                _ = ctx.run_feed(collection) => {}
            }
        });
    }

    async fn run_feed(&self, collection: Collection) {
        let mut subscription = match self.remote.listen(collection).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.fail_collection(collection, e.to_string());
                return;
            }
        };

        while let Some(event) = subscription.next().await {
            match event {
                FeedEvent::Snapshot(snapshot) => self.apply_snapshot(collection, snapshot),
                FeedEvent::Error(message) => {
                    self.fail_collection(collection, message);
                    return;
                }
            }
        }
        self.fail_collection(collection, "feed closed".to_string());
    }

    /// 用快照整体替换一个集合
    pub(crate) fn apply_snapshot(&self, collection: Collection, snapshot: Snapshot) {
        {
            let mut state = self.shared.state.write();
            match collection {
                Collection::Checks => state.checks = decode_all::<Check>(&snapshot),
                Collection::Tables => state.tables = decode_all::<DiningTable>(&snapshot),
            }
        }
        self.shared.status.write().mark_loaded(collection);
        tracing::debug!(
            collection = %collection,
            version = snapshot.version,
            documents = snapshot.len(),
            "Snapshot applied"
        );
        self.bump();
        self.persist();
        self.maybe_auto_seed();
    }

    /// 记录订阅错误并标记该集合已加载
    fn fail_collection(&self, collection: Collection, message: String) {
        let error = format!("{}: {}", collection, message);
        tracing::error!(error = %error, "Subscription failed");
        {
            let mut status = self.shared.status.write();
            status.error = Some(error);
            status.mark_loaded(collection);
        }
        self.bump();
        self.maybe_auto_seed();
    }

    /// 两个集合都加载后的首次检查: 都为空时执行一次初始化
    fn maybe_auto_seed(&self) {
        {
            let status = self.shared.status.read();
            if !(status.checks_loaded && status.tables_loaded) {
                return;
            }
        }
        if self.shared.did_auto_seed.swap(true, Ordering::SeqCst) {
            return;
        }
        let empty = {
            let state = self.shared.state.read();
            state.checks.is_empty() && state.tables.is_empty()
        };
        if !empty {
            return;
        }

        tracing::info!("Both collections are empty, provisioning");
        self.shared.status.write().seeding = true;
        self.bump();

        let pending = self.seed_provision();
        let ctx = self.clone();
        tokio::spawn(async move {
            let result = pending.await;
            {
                let mut status = ctx.shared.status.write();
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Auto provisioning failed");
                    status.error = Some(format!("seed failed: {}", e));
                }
                status.seeding = false;
            }
            ctx.bump();
        });
    }

    // ========== State ==========

    /// 修改本地快照，通知并写回缓存
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let result = {
            let mut state = self.shared.state.write();
            f(&mut state)
        };
        self.bump();
        self.persist();
        result
    }

    fn bump(&self) {
        self.shared.revision.send_modify(|revision| *revision += 1);
    }

    fn persist(&self) {
        if !self.shared.status.read().hydrated {
            return;
        }
        let payload = {
            let state = self.shared.state.read();
            CachePayload::new(state.checks.clone(), state.tables.clone())
        };
        self.shared.cache.schedule(payload);
    }

    pub(crate) fn writes(&self) -> &mpsc::UnboundedSender<QueuedWrite> {
        &self.shared.writes
    }

    // ========== Selection ==========

    pub fn set_selected_check(&self, check_id: Option<&str>) {
        self.shared.state.write().selected_check = check_id.map(str::to_string);
        self.bump();
    }

    pub fn set_selected_table(&self, table_id: Option<&str>) {
        self.shared.state.write().selected_table = table_id.map(str::to_string);
        self.bump();
    }

    // ========== Queries ==========

    /// 当前状态的完整副本
    pub fn snapshot(&self) -> AppState {
        self.shared.state.read().clone()
    }

    /// 在读锁下访问状态
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.shared.state.read())
    }

    pub fn check(&self, id: &str) -> Option<Check> {
        self.read(|s| s.check(id).cloned())
    }

    pub fn table(&self, id: &str) -> Option<DiningTable> {
        self.read(|s| s.table(id).cloned())
    }

    pub fn check_by_number(&self, check_number: u32) -> Option<Check> {
        self.read(|s| s.check_by_number(check_number).cloned())
    }

    pub fn table_by_number(&self, table_number: u32) -> Option<DiningTable> {
        self.read(|s| s.table_by_number(table_number).cloned())
    }

    pub fn assigned_checks(&self, table_id: &str) -> Vec<Check> {
        self.read(|s| s.assigned_checks(table_id).into_iter().cloned().collect())
    }

    pub fn checks_sorted(&self) -> Vec<Check> {
        self.read(|s| s.checks_sorted().into_iter().cloned().collect())
    }

    pub fn status(&self) -> LoadStatus {
        self.shared.status.read().clone()
    }

    pub fn loading(&self) -> bool {
        self.shared.status.read().loading()
    }

    pub fn error(&self) -> Option<String> {
        self.shared.status.read().error.clone()
    }

    pub fn seeding(&self) -> bool {
        self.shared.status.read().seeding
    }

    pub fn device_id(&self) -> &str {
        &self.shared.device_id
    }

    /// 订阅状态变化 (值为单调递增的修订号)
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.shared.revision.borrow()
    }

    // ========== Lifecycle ==========

    /// 首次加载完成且有数据可显示 (或已出错)
    pub fn is_ready(&self) -> bool {
        let status = self.status();
        if status.loading() || status.seeding {
            return false;
        }
        if status.error.is_some() {
            return true;
        }
        self.read(|s| !(s.checks.is_empty() && s.tables.is_empty()))
    }

    /// 等待 [`is_ready`](Self::is_ready)
    pub async fn wait_ready(&self, timeout: Duration) -> AppResult<()> {
        let mut revisions = self.subscribe();
        let ready = async {
            loop {
                if self.is_ready() {
                    return;
                }
                if revisions.changed().await.is_err() {
                    return;
                }
            }
        };
        tokio::time::timeout(timeout, ready)
            .await
            .map_err(|_| AppError::Timeout(format!("initial load after {:?}", timeout)))
    }

    /// 等待已安排的缓存写入完成
    pub async fn flush_cache(&self) {
        self.shared.cache.flush().await;
    }

    /// 停止订阅和缓存写入；已入队的远程写入仍会提交
    pub fn shutdown(&self) {
        self.shared.cancel.cancel();
    }
}

/// 缓存内容逐字段替换默认状态
fn hydrate(state: &mut AppState, payload: CachePayload) {
    if let Some(checks) = payload.checks {
        state.checks = checks;
    }
    if let Some(tables) = payload.tables {
        state.tables = tables;
    }
}

/// 解码快照中的文档；缺少编号等无法解码的文档跳过 (单个字段非法时按 `None` 保留)
fn decode_all<T: DeserializeOwned>(snapshot: &Snapshot) -> Vec<T> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(
                    collection = %snapshot.collection,
                    id = %doc.id,
                    error = %e,
                    "Skipping undecodable document"
                );
                None
            }
        })
        .collect()
}
