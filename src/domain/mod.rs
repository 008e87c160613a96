// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：校验记录等在各阶段之间传递的数据结构
/// - 服务（services）：页面抓取、选择器切片等业务规则
pub mod models;
pub mod services;
