// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt;

/// 校验结果代码
///
/// 在抓取、切片、渲染各阶段之间传递，用于对结果进行分类。
/// 判别值即对外约定的数值代码，不可更改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ValidationCode {
    /// 正常
    #[default]
    Ok = 0,
    /// 上游超时
    Timeout = 1,
    /// 上游无法连接（非超时的传输错误）
    Unreachable = 2,
    /// 抓取内容超过大小上限
    TooLarge = 3,
    /// 选择器未命中，结果仍然可用
    SelectorMissing = 4,
    /// 抓取或读取过程中的内部错误
    Internal = 5,
}

impl ValidationCode {
    /// 返回数值代码
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValidationCode::Ok => "ok",
            ValidationCode::Timeout => "timeout",
            ValidationCode::Unreachable => "unreachable",
            ValidationCode::TooLarge => "too_large",
            ValidationCode::SelectorMissing => "selector_missing",
            ValidationCode::Internal => "internal",
        };
        write!(f, "{} ({})", name, self.as_u8())
    }
}

/// 校验记录
///
/// 由成功标志和结果代码组成。流水线结束时满足：
/// - `code == Ok` 当且仅当 `valid` 且没有选择器未命中
/// - `code == SelectorMissing` 当且仅当 `valid` 且至少一个选择器未命中
/// - 其他非零代码意味着 `!valid`
///
/// 在抓取过程中记录处于"待定"状态（`valid == false`），
/// 由 [`Validation::finish`] 或 [`Validation::failed`] 收敛到合法状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Validation {
    valid: bool,
    code: ValidationCode,
}

impl Validation {
    /// 创建待定记录
    pub fn pending() -> Self {
        Self::default()
    }

    /// 创建失败记录
    pub fn failed(code: ValidationCode) -> Self {
        Self { valid: false, code }
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn code(&self) -> ValidationCode {
        self.code
    }

    /// 选择器未命中但结果可用
    pub fn is_partial(&self) -> bool {
        self.valid && self.code == ValidationCode::SelectorMissing
    }

    /// 标记选择器未命中
    pub fn mark_selector_miss(&mut self) {
        self.code = ValidationCode::SelectorMissing;
    }

    /// 将记录标记为失败，覆盖之前的代码
    pub fn fail(&mut self, code: ValidationCode) {
        self.valid = false;
        self.code = code;
    }

    /// 将待定记录收敛为成功
    ///
    /// 选择器未命中的代码会被保留，其他代码一律归零。
    pub fn finish(&mut self) {
        self.valid = true;
        if self.code != ValidationCode::SelectorMissing {
            self.code = ValidationCode::Ok;
        }
    }
}
