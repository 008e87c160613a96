// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::services::page_service::PageService;
use crate::presentation::handlers::capture_handler;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// 只有 `GET /capture` 一个路由，其他路径由路由器返回 404。
///
/// # 参数
///
/// * `page_service` - 页面服务
/// * `settings` - 应用配置
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(page_service: Arc<PageService>, settings: Arc<Settings>) -> Router {
    Router::new()
        .route("/capture", get(capture_handler::capture))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(page_service))
        .layer(Extension(settings))
}

/// 创建完整应用
///
/// 在路由匹配之前去掉路径末尾的斜杠，`/capture/` 与 `/capture` 等价。
pub fn app(page_service: Arc<PageService>, settings: Arc<Settings>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(routes(page_service, settings))
}
