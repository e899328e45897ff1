//! Application configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tableside_client::ClientConfig;

use super::error::{AppError, AppResult};

fn default_server_url() -> String {
    std::env::var("TABLESIDE_SERVER_URL").unwrap_or_else(|_| {
        tracing::debug!("TABLESIDE_SERVER_URL not set, using development default");
        "http://127.0.0.1:3030".to_string()
    })
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_load_timeout_secs() -> u64 {
    15
}

/// 应用配置 ({work_dir}/config.json)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// sync-server 地址
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// 提交请求超时 (秒)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 等待首次加载的超时 (秒)
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
            load_timeout_secs: default_load_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置，文件不存在时使用默认值
    pub fn load(path: &Path) -> AppResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.server_url.clone())
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}
