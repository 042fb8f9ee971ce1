//! 表达式错误类型
//!
//! 表达式求值只在少数情况下失败：未知函数、参数个数不符、未绑定参数、
//! 以及显式抛错的函数。类型不匹配按 AQL 语义返回 null，不视为错误。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};

/// 表达式错误类型枚举
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpressionErrorType {
    /// 未知函数
    UnknownFunction,
    /// 参数数量错误
    ArgumentCountError,
    /// 绑定参数缺失
    MissingBindParameter,
    /// 函数主动抛错
    FunctionFailed,
}

/// 表达式错误（结构化设计）
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ExpressionError {
    /// 错误类型
    pub error_type: ExpressionErrorType,
    /// 错误消息
    pub message: String,
}

impl ExpressionError {
    pub fn new(error_type: ExpressionErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            ExpressionErrorType::UnknownFunction,
            format!("未知函数: {}()", name),
        )
    }

    pub fn argument_count(name: &str, min: usize, max: usize) -> Self {
        Self::new(
            ExpressionErrorType::ArgumentCountError,
            format!("函数 {}() 的参数个数应在 {} 到 {} 之间", name, min, max),
        )
    }

    pub fn missing_bind_parameter(name: &str) -> Self {
        Self::new(
            ExpressionErrorType::MissingBindParameter,
            format!("绑定参数未声明: @{}", name),
        )
    }

    pub fn function_failed(message: impl Into<String>) -> Self {
        Self::new(ExpressionErrorType::FunctionFailed, message)
    }
}

impl ToPublicError for ExpressionError {
    fn error_code(&self) -> ErrorCode {
        match self.error_type {
            ExpressionErrorType::UnknownFunction => ErrorCode::QueryFunctionNameUnknown,
            ExpressionErrorType::ArgumentCountError => {
                ErrorCode::QueryFunctionArgumentNumberMismatch
            }
            ExpressionErrorType::MissingBindParameter => ErrorCode::QueryBindParameterMissing,
            ExpressionErrorType::FunctionFailed => ErrorCode::QueryFail,
        }
    }
}
