// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施模块
///
/// 外部渲染程序、PNG 编解码和指标导出
pub mod converter;
pub mod image_codec;
pub mod metrics;
