//! Document API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/collections/{collection} | GET | 当前有序快照 |
//! | /api/collections/{collection}/listen | GET | SSE 实时快照流 |
//! | /api/batch | POST | 原子提交合并写入批次 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/collections/{collection}", get(handler::snapshot))
        .route("/api/collections/{collection}/listen", get(handler::listen))
        .route("/api/batch", post(handler::commit))
}
