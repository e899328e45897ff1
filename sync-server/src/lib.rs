//! Sync Server - 餐厅前场协调的文档存储节点
//!
//! # 架构概述
//!
//! 为前场设备提供共享的文档存储：
//!
//! - **文档存储** (`store`): 两个集合 (checks / tables)，合并写入、原子批次、服务器时间戳
//! - **实时订阅** (`api::documents`): SSE 推送每次变更后的完整有序快照
//! - **持久化** (`store::Persistence`): 可选的 JSON 文件
//!
//! # 模块结构
//!
//! ```text
//! sync-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── store/         # 文档存储与持久化
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod core;
pub mod store;
pub mod utils;

pub use core::{Config, Server, ServerError, ServerState};
pub use store::{DocumentStore, Persistence};
pub use utils::logger::init_logger_with_file;

/// 设置运行环境：加载 .env 并初始化日志
pub fn setup_environment() -> Result<(), ServerError> {
    dotenv::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____                    
  / ___/__  ______  _____   
  \__ \/ / / / __ \/ ___/   
 ___/ / /_/ / / / / /__     
/____/\__, /_/ /_/\___/     
     /____/  tableside sync
    "#
    );
}
