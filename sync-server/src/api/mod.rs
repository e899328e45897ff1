//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`documents`] - 集合快照、批量提交、实时订阅

pub mod documents;
pub mod health;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// 组装完整的 HTTP 应用
pub fn build_app(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(documents::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
