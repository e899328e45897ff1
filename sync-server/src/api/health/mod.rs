//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 |
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "epoch": "5f0c...",
//!   "uptime_seconds": 42,
//!   "collections": { "checks": 100, "tables": 44 }
//! }
//! ```

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use shared::document::Collection;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// 进程实例 ID
    epoch: String,
    uptime_seconds: u64,
    /// 每个集合的可见文档数
    collections: BTreeMap<Collection, usize>,
}

/// GET /health
async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let collections = Collection::ALL
        .into_iter()
        .map(|c| (c, state.store.snapshot(c).len()))
        .collect();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        epoch: state.epoch.clone(),
        uptime_seconds: state.uptime_seconds(),
        collections,
    })
}
