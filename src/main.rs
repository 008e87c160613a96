// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use axum::{extract::Request, ServiceExt};
use capturs::config::settings::Settings;
use capturs::domain::services::page_service::PageService;
use capturs::engines::reqwest_engine::ReqwestFetcher;
use capturs::infrastructure::metrics::init_metrics;
use capturs::presentation::routes;
use capturs::utils::telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting capturs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Metrics exporter on its own listener
    init_metrics(&settings.metrics);

    // 4. Temp directory must exist before the first request
    let temp_dir = &settings.converter.temp_dir;
    tokio::fs::create_dir_all(temp_dir)
        .await
        .with_context(|| format!("failed to create temp directory {}", temp_dir.display()))?;
    info!(
        "Rendering with `{}` into {}",
        settings.converter.command,
        temp_dir.display()
    );

    // 5. Initialize components
    let fetcher = Arc::new(ReqwestFetcher::new(&settings.fetch)?);
    let page_service = Arc::new(PageService::new(fetcher, settings.fetch.max_html_size));

    // 6. Start HTTP server
    let app = routes::app(page_service, settings.clone());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
