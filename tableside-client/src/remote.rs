//! 远程文档存储抽象
//!
//! [`RemoteStore`] 是前场设备访问共享数据的唯一接缝：
//! 网络实现、进程内实现和测试替身都实现它。

use async_trait::async_trait;
use shared::document::{Collection, CommitResult, FeedEvent, WriteBatch};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ClientResult;

/// 远程文档存储
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// 原子提交一个合并写入批次
    async fn commit(&self, batch: WriteBatch) -> ClientResult<CommitResult>;

    /// 订阅集合
    ///
    /// 首个事件为当前完整快照，之后每次变更推送一次完整快照。
    /// 出错时推送 [`FeedEvent::Error`] 并结束，不会自动重连。
    async fn listen(&self, collection: Collection) -> ClientResult<FeedSubscription>;
}

/// 一个集合订阅的接收端
///
/// Drop 时取消生产端任务
#[derive(Debug)]
pub struct FeedSubscription {
    collection: Collection,
    rx: mpsc::Receiver<FeedEvent>,
    cancel: CancellationToken,
}

/// 一个集合订阅的生产端
#[derive(Debug, Clone)]
pub struct FeedSender {
    collection: Collection,
    tx: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
}

impl FeedSubscription {
    /// 创建一对生产端/接收端
    pub fn channel(collection: Collection, buffer: usize) -> (FeedSender, FeedSubscription) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        (
            FeedSender {
                collection,
                tx,
                cancel: cancel.clone(),
            },
            FeedSubscription {
                collection,
                rx,
                cancel,
            },
        )
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// 下一个事件，生产端结束后返回 `None`
    pub async fn next(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    /// 主动取消订阅
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl FeedSender {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// 推送事件，接收端已关闭或已取消时返回 `false`
    pub async fn send(&self, event: FeedEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    /// 推送错误事件
    pub async fn fail(&self, message: impl Into<String>) -> bool {
        self.send(FeedEvent::Error(message.into())).await
    }

    /// 接收端取消时完成
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
