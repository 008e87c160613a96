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

use super::helpers::{refused_url, Renderer, TestApp, TestResponse};
use axum::http::{header, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "<html><body><p>Hi</p></body></html>";

async fn upstream_with(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

async fn upstream_page(body: &str) -> MockServer {
    upstream_with(ResponseTemplate::new(200).set_body_string(body)).await
}

fn assert_png_response(response: &TestResponse) {
    assert_eq!(
        response.headers.get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let content_length: usize = response
        .headers
        .get(header::CONTENT_LENGTH)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(content_length, response.body.len());

    let image = image::load_from_memory_with_format(&response.body, image::ImageFormat::Png)
        .expect("response body should be a decodable PNG");
    assert_eq!((image.width(), image.height()), (4, 3));
}

fn assert_plain_error(response: &TestResponse, status: StatusCode, message: &str) {
    assert_eq!(response.status, status);
    assert_eq!(
        response.headers.get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    assert_eq!(response.text(), message);
}

/// 缺少 url 参数时返回 502
#[tokio::test]
async fn missing_url_returns_bad_gateway() {
    let app = TestApp::new(Renderer::Fixture);

    let response = app.get("/capture").await;
    assert_plain_error(
        &response,
        StatusCode::BAD_GATEWAY,
        "Capture page not found in querystring.",
    );

    let response = app.get("/capture?url=&dynamic_size_selector=body").await;
    assert_plain_error(
        &response,
        StatusCode::BAD_GATEWAY,
        "Capture page not found in querystring.",
    );
}

/// 路径末尾的斜杠被规范化
#[tokio::test]
async fn trailing_slash_reaches_capture() {
    let app = TestApp::new(Renderer::Fixture);

    let response = app.get("/capture/").await;
    assert_plain_error(
        &response,
        StatusCode::BAD_GATEWAY,
        "Capture page not found in querystring.",
    );
}

/// 上游无法连接时返回 503
#[tokio::test]
async fn unreachable_upstream_returns_service_unavailable() {
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture(&refused_url(), None).await;
    assert_plain_error(
        &response,
        StatusCode::SERVICE_UNAVAILABLE,
        "Capture site could not be contacted",
    );
    assert!(app.last_rendered_input().is_none());
}

/// 非 HTTP 的 URL 同样视为无法连接
#[tokio::test]
async fn invalid_url_returns_service_unavailable() {
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture("not a url", None).await;
    assert_plain_error(
        &response,
        StatusCode::SERVICE_UNAVAILABLE,
        "Capture site could not be contacted",
    );
}

/// 上游超时返回 504
#[tokio::test]
async fn slow_upstream_returns_gateway_timeout() {
    let server = upstream_with(
        ResponseTemplate::new(200)
            .set_body_string(PAGE)
            .set_delay(Duration::from_secs(5)),
    )
    .await;
    let app = TestApp::with_fetch_timeout(Renderer::Fixture, 1);

    let response = app.capture(&server.uri(), None).await;
    assert_plain_error(
        &response,
        StatusCode::GATEWAY_TIMEOUT,
        "Capture site did not load in time",
    );
}

/// 超过大小上限返回 400
#[tokio::test]
async fn oversized_page_returns_bad_request() {
    let server = upstream_page(&"a".repeat(100_000)).await;
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture(&server.uri(), None).await;
    assert_plain_error(&response, StatusCode::BAD_REQUEST, "Request is too large");
    assert!(app.last_rendered_input().is_none());
}

/// 大小上限包含边界值
#[tokio::test]
async fn size_cap_boundary() {
    let app = TestApp::new(Renderer::Fixture);

    let at_cap = upstream_page(&"a".repeat(75_000)).await;
    let response = app.capture(&at_cap.uri(), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_png_response(&response);

    let over_cap = upstream_page(&"a".repeat(75_001)).await;
    let response = app.capture(&over_cap.uri(), None).await;
    assert_plain_error(&response, StatusCode::BAD_REQUEST, "Request is too large");
}

/// 选择器命中时渲染切片并返回 200
#[tokio::test]
async fn matching_selector_renders_fragment() {
    let server = upstream_page(PAGE).await;
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture(&server.uri(), Some("body p")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_png_response(&response);
    assert_eq!(app.last_rendered_input().unwrap(), b"<p>Hi</p>");
    assert!(app.leftover_temp_files().is_empty());
}

/// 没有选择器时渲染整页
#[tokio::test]
async fn no_selector_renders_full_page() {
    let server = upstream_page(PAGE).await;
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture(&server.uri(), None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_png_response(&response);
    assert_eq!(app.last_rendered_input().unwrap(), PAGE.as_bytes());
}

/// 选择器未命中时渲染整页并返回 206
#[tokio::test]
async fn missing_selector_returns_partial_content() {
    let server = upstream_page(PAGE).await;
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture(&server.uri(), Some("nav")).await;

    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_png_response(&response);
    assert_eq!(app.last_rendered_input().unwrap(), PAGE.as_bytes());
    assert!(app.leftover_temp_files().is_empty());
}

/// 上游错误页面同样会被渲染
#[tokio::test]
async fn upstream_error_pages_are_rendered() {
    let server = upstream_with(
        ResponseTemplate::new(500).set_body_string("<html><body>Oops</body></html>"),
    )
    .await;
    let app = TestApp::new(Renderer::Fixture);

    let response = app.capture(&server.uri(), Some("body")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_png_response(&response);
    assert_eq!(app.last_rendered_input().unwrap(), b"<body>Oops</body>");
}

/// 渲染程序失败返回 500 并清理临时文件
#[tokio::test]
async fn renderer_failure_returns_internal_error() {
    let server = upstream_page(PAGE).await;
    let app = TestApp::new(Renderer::Fails);

    let response = app.capture(&server.uri(), None).await;

    assert_plain_error(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
    );
    assert!(app.leftover_temp_files().is_empty());
}

/// 渲染输出不是 PNG 时返回 500
#[tokio::test]
async fn invalid_png_returns_internal_error() {
    let server = upstream_page(PAGE).await;
    let app = TestApp::new(Renderer::Garbage);

    let response = app.capture(&server.uri(), None).await;

    assert_plain_error(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
    );
    assert!(app.leftover_temp_files().is_empty());
}

/// 渲染程序没有写出文件时返回 500
#[tokio::test]
async fn missing_output_returns_internal_error() {
    let server = upstream_page(PAGE).await;
    let app = TestApp::new(Renderer::NoOutput);

    let response = app.capture(&server.uri(), None).await;

    assert_plain_error(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
    );
    assert!(app.leftover_temp_files().is_empty());
}

/// 并发请求互不干扰，且全部清理临时文件
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_captures_do_not_collide() {
    let server = upstream_page(PAGE).await;
    let app = Arc::new(TestApp::new(Renderer::Fixture));
    let uri = server.uri();

    let mut handles = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        let uri = uri.clone();
        let selector = if i % 2 == 0 { "body p" } else { "nav" };
        handles.push(tokio::spawn(async move {
            app.capture(&uri, Some(selector)).await.status
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let status = handle.await.unwrap();
        let expected = if i % 2 == 0 {
            StatusCode::OK
        } else {
            StatusCode::PARTIAL_CONTENT
        };
        assert_eq!(status, expected);
    }

    assert!(app.leftover_temp_files().is_empty());
}
