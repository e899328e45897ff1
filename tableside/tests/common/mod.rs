//! 集成测试公共工具: 进程内存储、可编排的远程存储替身

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use shared::document::{
    Collection, CommitResult, Document, FeedEvent, FieldValue, Snapshot, WriteBatch,
};
use shared::error::ErrorCode;
use shared::models::{CHECK_COUNT, Check, DiningTable, TABLE_NUMBERS, check_id, table_id};
use sync_server::DocumentStore;
use tableside::core::LocalCache;
use tableside::{AppContext, ContextOptions};
use tableside_client::{
    ClientError, ClientResult, FeedSender, FeedSubscription, LocalRemoteStore, RemoteStore,
};

pub const DEVICE_ID: &str = "test-device";
pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn options(dir: &Path) -> ContextOptions {
    ContextOptions {
        cache: LocalCache::new(dir.join("cache/app_state.v1.json")),
        device_id: DEVICE_ID.to_string(),
    }
}

/// 已初始化 44 个桌台和 100 个账单的文档存储
pub async fn seeded_store() -> DocumentStore {
    let store = DocumentStore::new(64);
    let mut batch = WriteBatch::new();
    for &n in TABLE_NUMBERS.iter() {
        batch.set_merge(Collection::Tables, table_id(n), [("tableNumber", FieldValue::set(n))]);
    }
    for n in 1..=CHECK_COUNT {
        batch.set_merge(Collection::Checks, check_id(n), [("checkNumber", FieldValue::set(n))]);
    }
    store.commit(batch).await.unwrap();
    store
}

/// 启动连接到进程内存储的上下文，并等待首次加载
pub async fn start_local(store: &DocumentStore, dir: &Path) -> AppContext {
    let remote = Arc::new(LocalRemoteStore::new(store.clone()));
    let ctx = AppContext::start(remote, options(dir)).await;
    ctx.wait_ready(TIMEOUT).await.unwrap();
    ctx
}

/// 等待条件成立 (每次状态变化后检查)
pub async fn wait_for(ctx: &AppContext, f: impl Fn(&AppContext) -> bool) {
    let mut revisions = ctx.subscribe();
    tokio::time::timeout(TIMEOUT, async {
        loop {
            if f(ctx) {
                return;
            }
            if revisions.changed().await.is_err() {
                panic!("context dropped");
            }
        }
    })
    .await
    .expect("condition not reached");
}

/// 等待本地状态与存储中的最新快照一致 (之前排队的快照都已应用)
pub async fn settle(ctx: &AppContext, store: &DocumentStore) {
    let checks: Vec<Check> = store
        .snapshot(Collection::Checks)
        .documents
        .iter()
        .filter_map(|d| d.decode().ok())
        .collect();
    let tables: Vec<DiningTable> = store
        .snapshot(Collection::Tables)
        .documents
        .iter()
        .filter_map(|d| d.decode().ok())
        .collect();
    wait_for(ctx, |ctx| ctx.read(|s| s.checks == checks && s.tables == tables)).await;
}

pub fn check_doc(n: u32, fields: serde_json::Value) -> Document {
    let mut object = json!({"checkNumber": n});
    if let (Some(base), Some(extra)) = (object.as_object_mut(), fields.as_object()) {
        base.extend(extra.clone());
    }
    Document::new(check_id(n), object.as_object().cloned().unwrap_or_default())
}

pub fn table_doc(n: u32, fields: serde_json::Value) -> Document {
    let mut object = json!({"tableNumber": n});
    if let (Some(base), Some(extra)) = (object.as_object_mut(), fields.as_object()) {
        base.extend(extra.clone());
    }
    Document::new(table_id(n), object.as_object().cloned().unwrap_or_default())
}

pub fn snapshot(collection: Collection, version: u64, documents: Vec<Document>) -> Snapshot {
    Snapshot {
        collection,
        version,
        documents,
    }
}

/// 可编排的远程存储
///
/// 订阅事件由测试通过 [`FeedSender`] 推送；提交记录下来，按设置成功或失败
pub struct ScriptedRemote {
    subscriptions: Mutex<HashMap<Collection, FeedSubscription>>,
    listen_errors: Mutex<HashMap<Collection, String>>,
    commits: Mutex<Vec<WriteBatch>>,
    fail_commits: Mutex<bool>,
}

pub struct Feeds {
    pub checks: FeedSender,
    pub tables: FeedSender,
}

impl ScriptedRemote {
    pub fn new() -> (Arc<Self>, Feeds) {
        let (checks, checks_sub) = FeedSubscription::channel(Collection::Checks, 16);
        let (tables, tables_sub) = FeedSubscription::channel(Collection::Tables, 16);
        let subscriptions = HashMap::from([
            (Collection::Checks, checks_sub),
            (Collection::Tables, tables_sub),
        ]);
        let remote = Arc::new(Self {
            subscriptions: Mutex::new(subscriptions),
            listen_errors: Mutex::new(HashMap::new()),
            commits: Mutex::new(Vec::new()),
            fail_commits: Mutex::new(false),
        });
        (remote, Feeds { checks, tables })
    }

    /// 该集合的 listen 调用直接失败
    pub fn fail_listen(&self, collection: Collection, message: &str) {
        self.listen_errors.lock().insert(collection, message.to_string());
    }

    pub fn fail_commits(&self, fail: bool) {
        *self.fail_commits.lock() = fail;
    }

    pub fn commits(&self) -> Vec<WriteBatch> {
        self.commits.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn commit(&self, batch: WriteBatch) -> ClientResult<CommitResult> {
        let collections = batch.collections();
        self.commits.lock().push(batch);
        if *self.fail_commits.lock() {
            return Err(ClientError::Api {
                code: ErrorCode::StorageError,
                message: "write rejected".to_string(),
            });
        }
        Ok(CommitResult {
            commit_time: Utc::now(),
            versions: collections.into_iter().map(|c| (c, 1)).collect(),
        })
    }

    async fn listen(&self, collection: Collection) -> ClientResult<FeedSubscription> {
        if let Some(message) = self.listen_errors.lock().get(&collection) {
            return Err(ClientError::InvalidResponse(message.clone()));
        }
        self.subscriptions
            .lock()
            .remove(&collection)
            .ok_or_else(|| ClientError::InvalidResponse("already listening".to_string()))
    }
}

pub fn all_check_docs() -> Vec<Document> {
    (1..=CHECK_COUNT).map(|n| check_doc(n, json!({}))).collect()
}

pub fn all_table_docs() -> Vec<Document> {
    TABLE_NUMBERS.iter().map(|&n| table_doc(n, json!({}))).collect()
}

/// 推送两个集合的快照并等待两者都应用
pub async fn deliver(ctx: &AppContext, feeds: &Feeds, checks: Vec<Document>, tables: Vec<Document>) {
    let start = ctx.revision();
    let checks = FeedEvent::Snapshot(snapshot(Collection::Checks, start + 1, checks));
    let tables = FeedEvent::Snapshot(snapshot(Collection::Tables, start + 1, tables));
    assert!(feeds.checks.send(checks).await);
    assert!(feeds.tables.send(tables).await);
    wait_for(ctx, |ctx| {
        let status = ctx.status();
        status.checks_loaded && status.tables_loaded && ctx.revision() >= start + 2
    })
    .await;
}
