// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, warn};

use crate::domain::models::validation::{Validation, ValidationCode};
use crate::domain::services::selector::apply_selector;
use crate::engines::traits::PageFetcher;

/// 抓取结果
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 切片后的 HTML；失败时可能为空
    pub html: Bytes,
    /// 校验记录
    pub validation: Validation,
}

/// 页面服务
///
/// 负责抓取页面、按选择器切片并检查大小上限
pub struct PageService {
    fetcher: Arc<dyn PageFetcher>,
    max_html_size: usize,
}

impl PageService {
    /// 创建新的页面服务实例
    ///
    /// # 参数
    ///
    /// * `fetcher` - 页面抓取器
    /// * `max_html_size` - 切片后 HTML 的字节上限
    pub fn new(fetcher: Arc<dyn PageFetcher>, max_html_size: usize) -> Self {
        Self {
            fetcher,
            max_html_size,
        }
    }

    /// 获取页面 HTML
    ///
    /// # 参数
    ///
    /// * `url` - 目标页面
    /// * `selector` - 选择器表达式，可为空
    ///
    /// # 返回值
    ///
    /// 抓取结果。传输失败时 HTML 为空；超过大小上限时返回切片后的 HTML
    /// 以及失败的校验记录。
    pub async fn get_page_html(&self, url: &str, selector: &str) -> FetchedPage {
        let mut validation = Validation::pending();

        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(e) => {
                let code = e.validation_code();
                warn!(url, engine = self.fetcher.name(), error = %e, "Fetch failed");
                counter!("capture_fetch_failures_total", "code" => code.as_u8().to_string())
                    .increment(1);
                return FetchedPage {
                    html: Bytes::new(),
                    validation: Validation::failed(code),
                };
            }
        };

        let mut html = response.body;
        if !selector.is_empty() {
            let sliced = apply_selector(&html, selector, &mut validation);
            html = html.slice_ref(sliced);
            if validation.code() == ValidationCode::SelectorMissing {
                counter!("capture_selector_misses_total").increment(1);
            }
        }

        if html.len() > self.max_html_size {
            warn!(
                url,
                bytes = html.len(),
                limit = self.max_html_size,
                "HTML selection too large for image conversion"
            );
            validation.fail(ValidationCode::TooLarge);
            counter!("capture_fetch_failures_total", "code" => ValidationCode::TooLarge.as_u8().to_string())
                .increment(1);
            return FetchedPage { html, validation };
        }

        validation.finish();
        debug!(
            url,
            upstream_status = response.status_code,
            bytes = html.len(),
            code = %validation.code(),
            "Page HTML ready"
        );

        FetchedPage { html, validation }
    }
}
