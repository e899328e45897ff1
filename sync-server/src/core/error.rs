use thiserror::Error;

/// 服务器启动/运行错误
///
/// 请求级错误使用 [`shared::error::AppError`]
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("无法绑定端口 {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
