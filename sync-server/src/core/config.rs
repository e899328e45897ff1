use std::path::PathBuf;

/// 服务器配置 - 文档存储节点的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3030 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | FEED_CHANNEL_CAPACITY | 256 | 每个集合的快照广播缓冲 |
/// | DATA_FILE | (未设置) | JSON 持久化文件，未设置时仅内存 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，未设置时输出到 stdout |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=8080 DATA_FILE=./data/documents.json cargo run -p sync-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 快照广播通道容量 (慢订阅者超出后收到最新快照)
    pub feed_channel_capacity: usize,
    /// 持久化文件路径
    pub data_file: Option<PathBuf>,
    /// 日志级别
    pub log_level: String,
    /// 日志目录
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3030),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            feed_channel_capacity: std::env::var("FEED_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(256),
            data_file: std::env::var("DATA_FILE").ok().map(PathBuf::from),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(http_port: u16, data_file: Option<PathBuf>) -> Self {
        let mut config = Self::from_env();
        config.http_port = http_port;
        config.data_file = data_file;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
