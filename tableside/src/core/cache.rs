//! LocalCache - 最近一次 checks/tables 快照的本地缓存
//!
//! 冷启动时用于立即显示 (可能过期的) 内容。订阅上线后不再具有权威性。
//! 所有读写失败只记录日志，从不向调用方暴露。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::models::{Check, DiningTable};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::error::AppResult;

/// 缓存文件内容
///
/// 两个字段都可缺省，缺省的集合保留内存中的默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<Check>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<DiningTable>>,
}

impl CachePayload {
    pub fn new(checks: Vec<Check>, tables: Vec<DiningTable>) -> Self {
        Self {
            checks: Some(checks),
            tables: Some(tables),
        }
    }
}

/// 单文件缓存
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取缓存
    ///
    /// 文件不存在时静默返回 `None`，损坏或不可读时记录警告并返回 `None`
    pub async fn read(&self) -> Option<CachePayload> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<Option<CachePayload>>(&content) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache payload is corrupt");
                None
            }
        }
    }

    /// 写入缓存 (先写临时文件再 rename)
    pub async fn write(&self, payload: &CachePayload) -> AppResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec(payload)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PendingWrite {
    generation: u64,
    payload: Option<Arc<CachePayload>>,
}

/// 后台缓存写入任务的句柄
///
/// 每次 [`schedule`](Self::schedule) 覆盖尚未写入的内容，写入任务总是写最新快照
#[derive(Debug, Clone)]
pub struct CacheWriter {
    pending: Arc<watch::Sender<PendingWrite>>,
    written: watch::Receiver<u64>,
}

impl CacheWriter {
    /// 启动写入任务
    pub fn spawn(cache: LocalCache, cancel: CancellationToken) -> Self {
        let (pending_tx, mut pending_rx) = watch::channel(PendingWrite::default());
        let (written_tx, written_rx) = watch::channel(0u64);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = pending_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let (generation, payload) = {
                    let pending = pending_rx.borrow_and_update();
                    (pending.generation, pending.payload.clone())
                };
                if let Some(payload) = payload
                    && let Err(e) = cache.write(&payload).await
                {
                    tracing::warn!(path = %cache.path().display(), error = %e, "cache write failed");
                }
                written_tx.send_replace(generation);
            }
            tracing::debug!("Cache writer stopped");
        });

        Self {
            pending: Arc::new(pending_tx),
            written: written_rx,
        }
    }

    /// 安排一次写入 (fire-and-forget)
    pub fn schedule(&self, payload: CachePayload) {
        self.pending.send_modify(|pending| {
            pending.generation += 1;
            pending.payload = Some(Arc::new(payload));
        });
    }

    /// 等待目前为止安排的写入全部落盘 (写入任务已停止时立即返回)
    pub async fn flush(&self) {
        let target = self.pending.borrow().generation;
        let mut written = self.written.clone();
        let _ = written.wait_for(|generation| *generation >= target).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{StatusColor, default_checks, default_tables};

    #[tokio::test]
    async fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("cache/app_state.v1.json"));
        assert_eq!(cache.read().await, None);
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_state.v1.json");
        std::fs::write(&path, "{\"checks\": [").unwrap();
        assert_eq!(LocalCache::new(&path).read().await, None);

        std::fs::write(&path, "null").unwrap();
        assert_eq!(LocalCache::new(&path).read().await, None);
    }

    #[tokio::test]
    async fn test_partial_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_state.v1.json");
        std::fs::write(&path, r#"{"tables": [{"id": "table-1", "tableNumber": 1, "color": "green"}]}"#)
            .unwrap();
        let payload = LocalCache::new(&path).read().await.unwrap();
        assert!(payload.checks.is_none());
        assert_eq!(payload.tables.unwrap()[0].color, Some(StatusColor::Green));
    }

    #[tokio::test]
    async fn test_round_trip_preserves_entity_fields() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("cache/app_state.v1.json"));

        let mut checks = default_checks();
        checks[6].table_id = Some("table-20".into());
        checks[6].color = Some(StatusColor::Purple);
        let mut tables = default_tables();
        tables[0].color = Some(StatusColor::Green);

        cache
            .write(&CachePayload::new(checks.clone(), tables.clone()))
            .await
            .unwrap();
        let read = cache.read().await.unwrap();

        let read_checks = read.checks.unwrap();
        let read_tables = read.tables.unwrap();
        for (a, b) in checks.iter().zip(read_checks.iter()) {
            assert_eq!(a.check_number, b.check_number);
            assert_eq!(a.table_id, b.table_id);
            assert_eq!(a.color, b.color);
        }
        for (a, b) in tables.iter().zip(read_tables.iter()) {
            assert_eq!(a.table_number, b.table_number);
            assert_eq!(a.color, b.color);
        }
    }

    #[tokio::test]
    async fn test_writer_keeps_latest() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("app_state.v1.json"));
        let writer = CacheWriter::spawn(cache.clone(), CancellationToken::new());

        for n in 1..=5u32 {
            let mut checks = default_checks();
            checks[0].table_id = Some(format!("table-{}", n));
            writer.schedule(CachePayload::new(checks, Vec::new()));
        }
        writer.flush().await;

        let payload = cache.read().await.unwrap();
        assert_eq!(payload.checks.unwrap()[0].table_id.as_deref(), Some("table-5"));
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let writer = CacheWriter::spawn(
            LocalCache::new(blocker.join("app_state.v1.json")),
            CancellationToken::new(),
        );
        writer.schedule(CachePayload::default());
        // completes even though the write failed
        writer.flush().await;
    }
}
