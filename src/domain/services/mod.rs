// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 页面服务（page_service）：抓取页面、切片并检查大小上限
/// - 选择器（selector）：按标签名切出 HTML 片段
pub mod page_service;
pub mod selector;
