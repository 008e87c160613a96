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

use axum::{
    extract::{Extension, RawQuery},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::{
    config::settings::Settings,
    domain::services::page_service::PageService,
    infrastructure::{converter::Converter, image_codec},
    presentation::errors::CaptureError,
};

/// 截图请求参数
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CaptureQuery {
    /// 目标页面
    pub url: Option<String>,
    /// 选择器表达式
    pub dynamic_size_selector: Option<String>,
}

impl CaptureQuery {
    /// 解析查询字符串，重复的键取第一个值
    pub fn parse(raw: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)?;
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "url" if query.url.is_none() => query.url = Some(value),
                "dynamic_size_selector" if query.dynamic_size_selector.is_none() => {
                    query.dynamic_size_selector = Some(value)
                }
                _ => {}
            }
        }
        Ok(query)
    }
}

/// `GET /capture`
///
/// 抓取 `url` 指向的页面，按 `dynamic_size_selector` 切片后渲染为 PNG。
/// 选择器未命中时返回 206 和整页图像。
pub async fn capture(
    Extension(page_service): Extension<Arc<PageService>>,
    Extension(settings): Extension<Arc<Settings>>,
    RawQuery(query): RawQuery,
) -> Response {
    let response = match run_capture(&page_service, &settings, query.as_deref()).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    counter!("capture_requests_total", "status" => response.status().as_u16().to_string())
        .increment(1);
    response
}

async fn run_capture(
    page_service: &PageService,
    settings: &Settings,
    raw_query: Option<&str>,
) -> Result<Response, CaptureError> {
    // form_urlencoded decodes lossily, so this branch is not reached in practice;
    // the 502 "Capture page not found." response stays as the parse-failure contract
    let query = CaptureQuery::parse(raw_query.unwrap_or_default()).map_err(|e| {
        warn!("Failed to parse capture query: {}", e);
        CaptureError::QueryUnparsable
    })?;

    let url = query
        .url
        .filter(|url| !url.is_empty())
        .ok_or(CaptureError::MissingUrl)?;
    let selector = query.dynamic_size_selector.unwrap_or_default();

    let page = page_service.get_page_html(&url, &selector).await;
    if let Some(err) = CaptureError::from_validation(&page.validation) {
        info!(url = %url, code = %page.validation.code(), "Capture rejected");
        return Err(err);
    }

    let started = Instant::now();
    // Dropping the converter removes its temp files on every exit path below
    let converter = Converter::convert(page.html, &settings.converter)
        .await
        .map_err(|e| {
            error!(url = %url, error = %e, "Error converting to png");
            CaptureError::Internal
        })?;
    let elapsed = started.elapsed();
    histogram!("capture_render_duration_seconds").record(elapsed.as_secs_f64());

    let rendered = tokio::fs::read(converter.output_path()).await.map_err(|e| {
        error!(
            id = converter.id(),
            path = %converter.output_path().display(),
            error = %e,
            "Error reading temp png file"
        );
        CaptureError::Internal
    })?;

    let id = converter.id().to_string();
    let buffer = tokio::task::spawn_blocking(move || {
        let image = image_codec::decode_png(&rendered).map_err(|e| {
            error!(id = %id, error = %e, "Error decoding rendered png");
            CaptureError::Internal
        })?;
        image_codec::encode_png(&image).map_err(|e| {
            error!(id = %id, error = %e, "Error encoding png");
            CaptureError::Internal
        })
    })
    .await
    .map_err(|e| {
        error!(error = %e, "PNG re-encode task failed");
        CaptureError::Internal
    })??;

    // 205 cannot carry a payload, so a selector miss is reported as partial content
    let status = if page.validation.is_partial() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    info!(
        id = converter.id(),
        url = %url,
        status = status.as_u16(),
        bytes = buffer.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Finished capture"
    );
    converter.release().await;

    Ok((
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CONTENT_LENGTH, HeaderValue::from(buffer.len())),
        ],
        buffer,
    )
        .into_response())
}
