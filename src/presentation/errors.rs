// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::domain::models::validation::{Validation, ValidationCode};

/// 截图接口错误类型
///
/// 每个变体对应固定的状态码和纯文本响应体。内部错误的原因只写日志，不返回给客户端。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Capture page not found.")]
    QueryUnparsable,

    #[error("Capture page not found in querystring.")]
    MissingUrl,

    #[error("Capture site did not load in time")]
    UpstreamTimeout,

    #[error("Capture site could not be contacted")]
    UpstreamUnreachable,

    #[error("Request is too large")]
    PayloadTooLarge,

    #[error("Internal server error")]
    Internal,
}

impl CaptureError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Missing or unparsable target is reported as 502, not 400
            CaptureError::QueryUnparsable | CaptureError::MissingUrl => StatusCode::BAD_GATEWAY,
            CaptureError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            CaptureError::UpstreamUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            CaptureError::PayloadTooLarge => StatusCode::BAD_REQUEST,
            CaptureError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 将失败的校验记录映射为错误；成功（包括部分成功）时返回 `None`
    pub fn from_validation(validation: &Validation) -> Option<Self> {
        if validation.valid() {
            return None;
        }
        Some(match validation.code() {
            ValidationCode::Timeout => CaptureError::UpstreamTimeout,
            ValidationCode::Unreachable => CaptureError::UpstreamUnreachable,
            ValidationCode::TooLarge => CaptureError::PayloadTooLarge,
            ValidationCode::Ok | ValidationCode::SelectorMissing | ValidationCode::Internal => {
                CaptureError::Internal
            }
        })
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
            self.to_string(),
        )
            .into_response()
    }
}
