//! JSON 文件持久化
//!
//! 每次提交后整体重写 (先写临时文件再 rename)，启动时整体加载。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::document::{Collection, Fields};
use tokio::sync::Mutex;

/// 单个集合的持久化形式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedCollection {
    pub version: u64,
    pub documents: BTreeMap<String, Fields>,
}

/// 持久化文件内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub collections: BTreeMap<Collection, PersistedCollection>,
}

/// 持久化文件句柄
///
/// `lock` 串行化写入，保证最后写入的总是最新状态
#[derive(Debug)]
pub struct Persistence {
    path: PathBuf,
    pub(super) lock: Mutex<()>,
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载持久化文件
    ///
    /// 文件不存在返回空状态；损坏时记录警告并返回空状态
    pub async fn load(&self) -> PersistedState {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Data file is corrupt, starting empty");
                    PersistedState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No data file yet, starting empty");
                PersistedState::default()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read data file, starting empty");
                PersistedState::default()
            }
        }
    }

    /// 写入持久化文件
    pub async fn save(&self, state: &PersistedState) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(state).map_err(std::io::Error::other)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
