//! AppPaths - 工作目录路径管理
//!
//! ## 目录结构
//!
//! ```text
//! {work_dir}/
//! ├── config.json              # 应用配置
//! ├── device_id.v1             # 设备标识
//! ├── cache/
//! │   └── app_state.v1.json    # 最近一次的 checks/tables 快照
//! ├── store/
//! │   └── documents.json       # --in-process 模式的文档存储
//! └── logs/                    # 按天滚动的日志
//! ```

use std::path::{Path, PathBuf};

/// 工作目录路径管理器
#[derive(Debug, Clone)]
pub struct AppPaths {
    base: PathBuf,
}

impl AppPaths {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            base: work_dir.into(),
        }
    }

    /// 默认工作目录: $TABLESIDE_HOME，否则 ./tableside-data
    pub fn default_work_dir() -> PathBuf {
        std::env::var("TABLESIDE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./tableside-data"))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// 配置文件: {work_dir}/config.json
    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// 设备标识: {work_dir}/device_id.v1
    pub fn device_id_file(&self) -> PathBuf {
        self.base.join("device_id.v1")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.base.join("cache")
    }

    /// 状态缓存: {work_dir}/cache/app_state.v1.json
    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir().join("app_state.v1.json")
    }

    /// 进程内文档存储: {work_dir}/store/documents.json
    pub fn local_store_file(&self) -> PathBuf {
        self.base.join("store").join("documents.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// 创建所有目录
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.cache_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = AppPaths::new("/srv/tableside");
        assert_eq!(
            paths.cache_file(),
            PathBuf::from("/srv/tableside/cache/app_state.v1.json")
        );
        assert_eq!(
            paths.device_id_file(),
            PathBuf::from("/srv/tableside/device_id.v1")
        );
        assert_eq!(
            paths.local_store_file(),
            PathBuf::from("/srv/tableside/store/documents.json")
        );
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path().join("work"));
        paths.ensure_dirs().unwrap();
        assert!(paths.cache_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
