// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 基于标签名的 HTML 切片
//!
//! 纯文本匹配，不解析 HTML。已知的局限：
//! - `<` + 标签名是前缀匹配，`p` 同样会命中 `<pre`
//! - 结束标签总是从当前切片的起始位置开始搜索，而不是从开始标签之后

use tracing::debug;

use crate::domain::models::validation::Validation;

/// 按选择器表达式逐层缩小 HTML 切片
///
/// 选择器按空白拆分为元素名序列，每个元素名作用于上一步的结果，
/// 因此多个元素名是嵌套关系（例如 `body div table`）。
///
/// 任一元素名找不到开始标签或结束标签，或者结束标签出现在开始标签之前时，
/// 将校验记录标记为选择器未命中并返回上一步的切片。
///
/// # 参数
///
/// * `html` - 原始 HTML
/// * `selector` - 选择器表达式
/// * `validation` - 校验记录，未命中时被修改
///
/// # 返回值
///
/// `html` 的一个连续子切片
pub fn apply_selector<'a>(html: &'a [u8], selector: &str, validation: &mut Validation) -> &'a [u8] {
    let mut current = html;

    for element in selector.split_whitespace() {
        let name = element.as_bytes();

        let open_tag = [b"<".as_slice(), name].concat();
        let Some(start) = find(current, &open_tag) else {
            debug!(element, "Opening tag not found, keeping current selection");
            validation.mark_selector_miss();
            break;
        };

        let close_tag = [b"</".as_slice(), name].concat();
        let Some(close) = find(current, &close_tag) else {
            debug!(element, "Closing tag not found, keeping current selection");
            validation.mark_selector_miss();
            break;
        };

        // length of `</name>`
        let end = close + 3 + name.len();
        if close < start || end > current.len() {
            debug!(
                element,
                start, end, "Closing tag does not follow opening tag, keeping current selection"
            );
            validation.mark_selector_miss();
            break;
        }

        current = &current[start..end];
    }

    current
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
