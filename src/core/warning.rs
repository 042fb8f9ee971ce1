//! 查询警告
//!
//! 警告不会中断查询，随 explain/execute 结果一起返回给调用方。

use serde::{Deserialize, Serialize};

use crate::core::error::ErrorCode;

/// 单条警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: i32,
    pub message: String,
}

impl Warning {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i32(),
            message: message.into(),
        }
    }
}

/// 警告收集器，同一查询最多保留 `limit` 条
#[derive(Debug, Clone)]
pub struct WarningCollector {
    warnings: Vec<Warning>,
    limit: usize,
}

impl WarningCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            warnings: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, warning: Warning) {
        if self.warnings.len() < self.limit {
            self.warnings.push(warning);
        }
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for warning in warnings {
            self.push(warning);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn as_slice(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}

impl Default for WarningCollector {
    fn default() -> Self {
        Self::new(10)
    }
}
