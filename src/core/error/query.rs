//! 查询级错误类型
//!
//! explain/execute 对外只暴露这一种错误，内部各层错误通过 `#[from]` 汇聚，
//! 原始数值错误码通过 `error_num()` 保留。

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, PublicError, ToPublicError};
use crate::core::error::expression::ExpressionError;
use crate::core::error::optimize::OptimizeError;
use crate::core::error::plan::PlanError;
use crate::core::error::storage::StorageError;

/// 查询结果类型
pub type QueryResult<T> = Result<T, QueryError>;

/// 查询错误类型
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("表达式错误: {0}")]
    Expression(#[from] ExpressionError),

    #[error("优化器错误: {0}")]
    Optimize(#[from] OptimizeError),

    #[error("计划错误: {0}")]
    Plan(#[from] PlanError),

    #[error("查询已被终止")]
    Killed,

    #[error("无效查询: {0}")]
    InvalidQuery(String),

    #[error("执行错误: {0}")]
    ExecutionError(String),
}

impl QueryError {
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// 数值错误码
    pub fn error_num(&self) -> i32 {
        self.error_code().as_i32()
    }
}

impl ToPublicError for QueryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            QueryError::Storage(e) => e.error_code(),
            QueryError::Expression(e) => e.error_code(),
            QueryError::Optimize(e) => e.error_code(),
            QueryError::Plan(e) => e.error_code(),
            QueryError::Killed => ErrorCode::QueryKilled,
            QueryError::InvalidQuery(_) => ErrorCode::QueryParse,
            QueryError::ExecutionError(_) => ErrorCode::Internal,
        }
    }

    fn to_public_error(&self) -> PublicError {
        // 只暴露内层错误的消息
        let message = match self {
            QueryError::Storage(e) => e.to_string(),
            QueryError::Expression(e) => e.to_string(),
            QueryError::Optimize(e) => e.to_string(),
            QueryError::Plan(e) => e.to_string(),
            other => other.to_string(),
        };
        PublicError::new(self.error_code(), message)
    }
}
