//! Mutation Gateway - 所有实体修改的唯一写入路径
//!
//! 每个操作分两步：
//! 1. 同步修改本地快照 (乐观更新)，调用返回前即可见
//! 2. 把合并写入批次放入提交队列，由唯一的提交任务按顺序提交
//!
//! 返回的 [`PendingWrite`] 等待远程结果；丢弃它不会取消写入。
//! 远程失败不回滚本地修改，下一次订阅快照是唯一的纠正机制。

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use shared::document::{Collection, CommitResult, FieldValue, WriteBatch};
use shared::models::{CHECK_COUNT, StatusColor, TABLE_NUMBERS, check_id, table_id};
use tableside_client::RemoteStore;
use tokio::sync::{mpsc, oneshot};

use super::context::AppContext;
use super::error::{AppError, AppResult};

const FIELD_TABLE_ID: &str = "tableId";
const FIELD_COLOR: &str = "color";
const FIELD_UPDATED_AT: &str = "updatedAt";
const FIELD_UPDATED_BY: &str = "updatedByDeviceId";
const FIELD_CHECK_NUMBER: &str = "checkNumber";
const FIELD_TABLE_NUMBER: &str = "tableNumber";

/// 已提交写入的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// 批次中的文档写入数
    pub writes: usize,
    /// 服务器提交时间，空批次为 `None`
    pub commit_time: Option<DateTime<Utc>>,
}

impl WriteReceipt {
    fn empty() -> Self {
        Self {
            writes: 0,
            commit_time: None,
        }
    }
}

/// 提交队列中的一项
pub(crate) struct QueuedWrite {
    batch: WriteBatch,
    reply: oneshot::Sender<AppResult<CommitResult>>,
}

/// 启动提交任务
///
/// 单一任务按入队顺序提交，保证同一设备的写入顺序。
/// 所有发送端释放后退出，已入队的写入全部提交完才会退出。
pub(crate) fn spawn_commit_worker(remote: Arc<dyn RemoteStore>) -> mpsc::UnboundedSender<QueuedWrite> {
    let (tx, mut rx) = mpsc::unbounded_channel::<QueuedWrite>();
    tokio::spawn(async move {
        while let Some(QueuedWrite { batch, reply }) = rx.recv().await {
            let writes = batch.len();
            let result = remote.commit(batch).await.map_err(AppError::from);
            match &result {
                Ok(commit) => {
                    tracing::debug!(writes, commit_time = %commit.commit_time, "Write committed")
                }
                Err(e) => tracing::warn!(writes, error = %e, "Write failed, local state kept"),
            }
            // 调用方已放弃等待时忽略
            let _ = reply.send(result);
        }
        tracing::debug!("Commit worker stopped");
    });
    tx
}

enum PendingState {
    Ready(Option<AppResult<WriteReceipt>>),
    Queued(oneshot::Receiver<AppResult<CommitResult>>),
}

/// 远程写入的结果
///
/// await 得到远程结果；drop 则放弃结果，写入照常提交
#[must_use = "await the write to observe remote failures, or drop it to detach"]
pub struct PendingWrite {
    writes: usize,
    state: PendingState,
}

impl PendingWrite {
    fn ready(result: AppResult<WriteReceipt>) -> Self {
        Self {
            writes: 0,
            state: PendingState::Ready(Some(result)),
        }
    }

    fn queued(writes: usize, rx: oneshot::Receiver<AppResult<CommitResult>>) -> Self {
        Self {
            writes,
            state: PendingState::Queued(rx),
        }
    }

    /// 批次中的文档写入数
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl std::fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWrite")
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl Future for PendingWrite {
    type Output = AppResult<WriteReceipt>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let writes = this.writes;
        match &mut this.state {
            PendingState::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(AppError::WriteQueueClosed)))
            }
            PendingState::Queued(rx) => match Pin::new(rx).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(Ok(commit))) => Poll::Ready(Ok(WriteReceipt {
                    writes,
                    commit_time: Some(commit.commit_time),
                })),
                Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(e)),
                Poll::Ready(Err(_)) => Poll::Ready(Err(AppError::WriteQueueClosed)),
            },
        }
    }
}

impl AppContext {
    /// `updatedAt` / `updatedByDeviceId`
    fn stamp(&self) -> [(&'static str, FieldValue); 2] {
        [
            (FIELD_UPDATED_AT, FieldValue::ServerTimestamp),
            (FIELD_UPDATED_BY, FieldValue::set(self.device_id())),
        ]
    }

    /// 入队一个批次，空批次直接完成
    fn submit(&self, batch: WriteBatch) -> PendingWrite {
        if batch.is_empty() {
            return PendingWrite::ready(Ok(WriteReceipt::empty()));
        }
        let writes = batch.len();
        let (reply, rx) = oneshot::channel();
        if self.writes().send(QueuedWrite { batch, reply }).is_err() {
            return PendingWrite::ready(Err(AppError::WriteQueueClosed));
        }
        PendingWrite::queued(writes, rx)
    }

    fn check_fields(
        &self,
        batch: &mut WriteBatch,
        check_id: &str,
        fields: impl IntoIterator<Item = (&'static str, FieldValue)>,
    ) {
        batch.set_merge(
            Collection::Checks,
            check_id,
            fields.into_iter().chain(self.stamp()),
        );
    }

    fn table_fields(
        &self,
        batch: &mut WriteBatch,
        table_id: &str,
        fields: impl IntoIterator<Item = (&'static str, FieldValue)>,
    ) {
        batch.set_merge(
            Collection::Tables,
            table_id,
            fields.into_iter().chain(self.stamp()),
        );
    }

    /// 把账单分配到桌台 (无条件，重复分配同样会写入)
    pub fn assign_check_to_table(&self, check_id: &str, table_id: &str) -> PendingWrite {
        self.mutate(|state| {
            if let Some(check) = state.checks.iter_mut().find(|c| c.id == check_id) {
                check.table_id = Some(table_id.to_string());
            }
        });
        tracing::info!(check_id, table_id, "Assign check");

        let mut batch = WriteBatch::new();
        self.check_fields(&mut batch, check_id, [(FIELD_TABLE_ID, FieldValue::set(table_id))]);
        self.submit(batch)
    }

    /// 取消账单分配
    pub fn clear_check(&self, check_id: &str) -> PendingWrite {
        self.mutate(|state| {
            if let Some(check) = state.checks.iter_mut().find(|c| c.id == check_id) {
                check.table_id = None;
            }
        });
        tracing::info!(check_id, "Clear check");

        let mut batch = WriteBatch::new();
        self.check_fields(&mut batch, check_id, [(FIELD_TABLE_ID, FieldValue::null())]);
        self.submit(batch)
    }

    /// 清空桌台: 当前分配到该桌台的每个账单都取消分配
    pub fn clear_table(&self, table_id: &str) -> PendingWrite {
        let affected: Vec<String> = self.mutate(|state| {
            state
                .checks
                .iter_mut()
                .filter(|c| c.is_assigned_to(table_id))
                .map(|check| {
                    check.table_id = None;
                    check.id.clone()
                })
                .collect()
        });
        tracing::info!(table_id, checks = affected.len(), "Clear table");

        let mut batch = WriteBatch::new();
        for check_id in &affected {
            self.check_fields(&mut batch, check_id, [(FIELD_TABLE_ID, FieldValue::null())]);
        }
        self.submit(batch)
    }

    /// 批量分配，一个批次提交
    pub fn assign_multiple_checks_to_table<I, S>(&self, check_ids: I, table_id: &str) -> PendingWrite
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let check_ids: Vec<String> = check_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let id_set: HashSet<&str> = check_ids.iter().map(String::as_str).collect();

        self.mutate(|state| {
            for check in state.checks.iter_mut() {
                if id_set.contains(check.id.as_str()) {
                    check.table_id = Some(table_id.to_string());
                }
            }
        });
        tracing::info!(table_id, checks = check_ids.len(), "Assign multiple checks");

        let mut batch = WriteBatch::new();
        for check_id in &check_ids {
            self.check_fields(&mut batch, check_id, [(FIELD_TABLE_ID, FieldValue::set(table_id))]);
        }
        self.submit(batch)
    }

    /// 班次开始: 清空所有分配和颜色
    pub fn clear_all_assignments(&self) -> PendingWrite {
        let (check_ids, table_ids) = self.mutate(|state| {
            for check in state.checks.iter_mut() {
                check.table_id = None;
                check.color = None;
            }
            for table in state.tables.iter_mut() {
                table.color = None;
            }
            (
                state.checks.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
                state.tables.iter().map(|t| t.id.clone()).collect::<Vec<_>>(),
            )
        });
        tracing::info!(
            checks = check_ids.len(),
            tables = table_ids.len(),
            "Clear all assignments"
        );

        let mut batch = WriteBatch::new();
        for check_id in &check_ids {
            self.check_fields(
                &mut batch,
                check_id,
                [
                    (FIELD_TABLE_ID, FieldValue::null()),
                    (FIELD_COLOR, FieldValue::null()),
                ],
            );
        }
        for table_id in &table_ids {
            self.table_fields(&mut batch, table_id, [(FIELD_COLOR, FieldValue::null())]);
        }
        self.submit(batch)
    }

    pub fn set_check_color(&self, check_id: &str, color: StatusColor) -> PendingWrite {
        self.write_check_color(check_id, Some(color))
    }

    pub fn clear_check_color(&self, check_id: &str) -> PendingWrite {
        self.write_check_color(check_id, None)
    }

    pub fn set_table_color(&self, table_id: &str, color: StatusColor) -> PendingWrite {
        self.write_table_color(table_id, Some(color))
    }

    pub fn clear_table_color(&self, table_id: &str) -> PendingWrite {
        self.write_table_color(table_id, None)
    }

    fn write_check_color(&self, check_id: &str, color: Option<StatusColor>) -> PendingWrite {
        self.mutate(|state| {
            if let Some(check) = state.checks.iter_mut().find(|c| c.id == check_id) {
                check.color = color;
            }
        });
        tracing::info!(check_id, color = ?color, "Set check color");

        let mut batch = WriteBatch::new();
        self.check_fields(&mut batch, check_id, [(FIELD_COLOR, color_value(color))]);
        self.submit(batch)
    }

    fn write_table_color(&self, table_id: &str, color: Option<StatusColor>) -> PendingWrite {
        self.mutate(|state| {
            if let Some(table) = state.tables.iter_mut().find(|t| t.id == table_id) {
                table.color = color;
            }
        });
        tracing::info!(table_id, color = ?color, "Set table color");

        let mut batch = WriteBatch::new();
        self.table_fields(&mut batch, table_id, [(FIELD_COLOR, color_value(color))]);
        self.submit(batch)
    }

    /// 初始化固定的桌台和账单集合
    ///
    /// 只合并写入编号字段，不覆盖其他字段，可重复调用。
    /// 不修改本地快照，结果由订阅送达。
    pub fn seed_provision(&self) -> PendingWrite {
        let mut batch = WriteBatch::new();
        for &n in TABLE_NUMBERS.iter() {
            batch.set_merge(
                Collection::Tables,
                table_id(n),
                [(FIELD_TABLE_NUMBER, FieldValue::set(n))],
            );
        }
        for n in 1..=CHECK_COUNT {
            batch.set_merge(
                Collection::Checks,
                check_id(n),
                [(FIELD_CHECK_NUMBER, FieldValue::set(n))],
            );
        }
        tracing::info!(writes = batch.len(), "Seed provision");
        self.submit(batch)
    }
}

fn color_value(color: Option<StatusColor>) -> FieldValue {
    match color {
        Some(color) => FieldValue::set(color),
        None => FieldValue::null(),
    }
}
