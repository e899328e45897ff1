//! 进程内实现
//!
//! 直接包装 [`sync_server::DocumentStore`]，无网络开销。
//!
//! Requires the "in-process" feature.

#![cfg(feature = "in-process")]

use async_trait::async_trait;
use shared::document::{Collection, CommitResult, FeedEvent, WriteBatch};
use sync_server::DocumentStore;
use tokio::sync::broadcast::error::RecvError;

use crate::remote::{FeedSubscription, RemoteStore};
use crate::ClientResult;

const FEED_BUFFER: usize = 16;

/// 进程内文档存储客户端
#[derive(Debug, Clone)]
pub struct LocalRemoteStore {
    store: DocumentStore,
}

impl LocalRemoteStore {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

#[async_trait]
impl RemoteStore for LocalRemoteStore {
    async fn commit(&self, batch: WriteBatch) -> ClientResult<CommitResult> {
        Ok(self.store.commit(batch).await?)
    }

    async fn listen(&self, collection: Collection) -> ClientResult<FeedSubscription> {
        let (initial, mut rx) = self.store.subscribe(collection);
        let (tx, subscription) = FeedSubscription::channel(collection, FEED_BUFFER);
        let store = self.store.clone();

        tokio::spawn(async move {
            let mut last_version = initial.version;
            if !tx.send(FeedEvent::Snapshot(initial)).await {
                return;
            }
            loop {
                let next = tokio::select! {
                    _ = tx.cancelled() => return,
                    next = rx.recv() => next,
                };
                let snapshot = match next {
                    Ok(snapshot) => snapshot,
                    Err(RecvError::Lagged(_)) => store.snapshot(collection),
                    Err(RecvError::Closed) => {
                        tx.fail(format!("{} feed closed", collection)).await;
                        return;
                    }
                };
                if snapshot.version <= last_version {
                    continue;
                }
                last_version = snapshot.version;
                if !tx.send(FeedEvent::Snapshot(snapshot)).await {
                    return;
                }
            }
        });

        Ok(subscription)
    }
}
