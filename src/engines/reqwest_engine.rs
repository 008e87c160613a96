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

use crate::config::settings::FetchSettings;
use crate::engines::traits::{FetchError, FetchResponse, PageFetcher};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// 抓取引擎
///
/// 基于reqwest实现的HTTP抓取引擎。客户端在进程内共享，
/// 超时对整个请求（连接、重定向、读取响应体）生效。
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// 根据抓取配置创建引擎
    ///
    /// # 参数
    ///
    /// * `settings` - 抓取配置
    ///
    /// # 返回值
    ///
    /// * `Ok(ReqwestFetcher)` - 创建成功
    /// * `Err(reqwest::Error)` - 客户端构建失败（例如 TLS 后端初始化失败）
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self { client })
    }
}

fn classify_send_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else {
        FetchError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    /// 执行HTTP抓取
    ///
    /// 上游返回的状态码不做判断，任何响应体都会被读取并返回。
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let target = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme: {}",
                target.scheme()
            )));
        }

        let start = Instant::now();
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status_code = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::BodyRead(e.to_string()))?;

        debug!(
            url,
            status_code,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched page"
        );

        Ok(FetchResponse { status_code, body })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
