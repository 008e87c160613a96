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

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::models::validation::ValidationCode;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求超时
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// 无法连接上游
    #[error("Request failed: {0}")]
    Unreachable(String),
    /// URL 无效或协议不受支持
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// 读取响应体失败
    #[error("Failed to read response body: {0}")]
    BodyRead(String),
}

impl FetchError {
    /// 将传输错误映射为校验代码
    pub fn validation_code(&self) -> ValidationCode {
        match self {
            FetchError::Timeout(_) => ValidationCode::Timeout,
            FetchError::Unreachable(_) | FetchError::InvalidUrl(_) => ValidationCode::Unreachable,
            FetchError::BodyRead(_) => ValidationCode::Internal,
        }
    }
}

/// 抓取响应
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP状态码，仅用于记录，不参与判定
    pub status_code: u16,
    /// 完整响应体
    pub body: Bytes,
}

/// 页面抓取特质
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 对 `url` 执行 GET 并读取完整响应体
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;

    /// 抓取器名称
    fn name(&self) -> &'static str;
}
