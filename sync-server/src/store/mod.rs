//! 文档存储核心实现
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    DocumentStore                      │
//! │  RwLock<StoreState>                                   │
//! │    checks: { version, documents }                     │
//! │    tables: { version, documents }                     │
//! │  broadcast::Sender<Snapshot>  (每个集合一个)          │
//! └──────────────┬──────────────────────┬────────────────┘
//!                │ commit(batch)        │ subscribe(collection)
//!                ▼                      ▼
//!        合并写入 + 版本递增      初始快照 + 后续快照
//! ```
//!
//! 每次提交在同一把写锁内完成全部写入、版本递增和快照广播，
//! 因此订阅者看到的快照序列与提交顺序一致。

mod persistence;

pub use persistence::{PersistedCollection, PersistedState, Persistence};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use shared::document::{Collection, CommitResult, Document, Fields, Snapshot, WriteBatch};
use shared::error::{AppError, AppResult, ErrorCode};
use tokio::sync::broadcast;

/// 单个集合的内存状态
#[derive(Debug, Default)]
struct CollectionState {
    version: u64,
    documents: BTreeMap<String, Fields>,
}

impl CollectionState {
    /// 按排序字段升序的完整快照，缺少排序字段的文档不出现在结果中
    fn snapshot(&self, collection: Collection) -> Snapshot {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .filter(|doc| doc.order_key(collection).is_some())
            .collect();
        documents.sort_by(|a, b| {
            a.order_key(collection)
                .cmp(&b.order_key(collection))
                .then_with(|| a.id.cmp(&b.id))
        });
        Snapshot {
            collection,
            version: self.version,
            documents,
        }
    }
}

#[derive(Debug)]
struct StoreInner {
    state: RwLock<HashMap<Collection, CollectionState>>,
    feeds: HashMap<Collection, broadcast::Sender<Snapshot>>,
    persistence: Option<Persistence>,
}

/// 文档存储 - 合并写入、服务器时间戳、有序快照、实时推送
#[derive(Debug, Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

impl DocumentStore {
    /// 创建纯内存存储
    pub fn new(channel_capacity: usize) -> Self {
        Self::build(channel_capacity, PersistedState::default(), None)
    }

    /// 创建带文件持久化的存储 (启动时加载已有数据)
    pub async fn open(channel_capacity: usize, persistence: Persistence) -> Self {
        let persisted = persistence.load().await;
        let store = Self::build(channel_capacity, persisted, Some(persistence));
        for collection in Collection::ALL {
            let snapshot = store.snapshot(collection);
            tracing::info!(
                collection = %collection,
                documents = snapshot.len(),
                version = snapshot.version,
                "Collection loaded"
            );
        }
        store
    }

    fn build(
        channel_capacity: usize,
        persisted: PersistedState,
        persistence: Option<Persistence>,
    ) -> Self {
        let mut persisted = persisted;
        let mut state = HashMap::new();
        let mut feeds = HashMap::new();
        for collection in Collection::ALL {
            let loaded = persisted.collections.remove(&collection).unwrap_or_default();
            state.insert(
                collection,
                CollectionState {
                    version: loaded.version,
                    documents: loaded.documents,
                },
            );
            let (tx, _) = broadcast::channel(channel_capacity.max(1));
            feeds.insert(collection, tx);
        }
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(state),
                feeds,
                persistence,
            }),
        }
    }

    /// 当前快照
    pub fn snapshot(&self, collection: Collection) -> Snapshot {
        let state = self.inner.state.read();
        state
            .get(&collection)
            .map(|c| c.snapshot(collection))
            .unwrap_or_else(|| Snapshot {
                collection,
                version: 0,
                documents: Vec::new(),
            })
    }

    /// 订阅集合变更
    ///
    /// 返回初始快照和后续快照的接收端。两者在同一把读锁下获取，
    /// 不会漏掉中间的提交。
    pub fn subscribe(&self, collection: Collection) -> (Snapshot, broadcast::Receiver<Snapshot>) {
        let state = self.inner.state.read();
        let rx = self.inner.feeds[&collection].subscribe();
        let snapshot = state
            .get(&collection)
            .map(|c| c.snapshot(collection))
            .unwrap_or_else(|| Snapshot {
                collection,
                version: 0,
                documents: Vec::new(),
            });
        (snapshot, rx)
    }

    /// 原子提交一个批次
    ///
    /// - 先校验全部写入，任何一条不合法则整个批次拒绝
    /// - 所有 `server_timestamp` 解析为同一个提交时间
    /// - 合并语义：只写入指定字段，其他字段保留，文档不存在则创建
    pub async fn commit(&self, batch: WriteBatch) -> AppResult<CommitResult> {
        validate_batch(&batch)?;

        let commit_time = Utc::now();
        let mut versions = BTreeMap::new();
        {
            let mut state = self.inner.state.write();
            for write in &batch.writes {
                let collection = state.entry(write.collection).or_default();
                let document = collection.documents.entry(write.id.clone()).or_default();
                for (name, value) in &write.fields {
                    document.insert(name.clone(), value.resolve(commit_time));
                }
            }
            for collection in batch.collections() {
                let entry = state.entry(collection).or_default();
                entry.version += 1;
                versions.insert(collection, entry.version);
                // 没有订阅者时 send 返回 Err，忽略即可
                let _ = self.inner.feeds[&collection].send(entry.snapshot(collection));
            }
        }

        tracing::debug!(
            writes = batch.len(),
            versions = ?versions,
            "Batch committed"
        );

        if let Some(persistence) = &self.inner.persistence {
            let _guard = persistence.lock.lock().await;
            let exported = self.export();
            if let Err(e) = persistence.save(&exported).await {
                // 内存状态已生效并已推送，持久化失败只记录
                tracing::error!(path = %persistence.path().display(), error = %e, "Failed to persist documents");
            }
        }

        Ok(CommitResult {
            commit_time,
            versions,
        })
    }

    /// 导出全部数据 (持久化格式)
    pub fn export(&self) -> PersistedState {
        let state = self.inner.state.read();
        PersistedState {
            collections: state
                .iter()
                .map(|(collection, c)| {
                    (
                        *collection,
                        PersistedCollection {
                            version: c.version,
                            documents: c.documents.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// 当前订阅者数量
    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.inner.feeds[&collection].receiver_count()
    }
}

fn validate_batch(batch: &WriteBatch) -> AppResult<()> {
    if batch.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyBatch));
    }
    for (index, write) in batch.writes.iter().enumerate() {
        if write.id.trim().is_empty() || write.id.contains('/') {
            return Err(AppError::with_message(
                ErrorCode::InvalidDocumentId,
                format!("Invalid document id '{}'", write.id),
            )
            .with_detail("index", index)
            .with_detail("collection", write.collection.as_str()));
        }
    }
    Ok(())
}
