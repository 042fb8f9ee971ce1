//! 优化器错误类型
//!
//! 定义规则注册、规则调度与代价计算相关的错误类型。

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};
use crate::core::error::plan::PlanError;
use crate::core::error::storage::StorageError;

/// 优化器错误类型
#[derive(Error, Debug, Clone)]
pub enum OptimizeError {
    /// 两条规则互相撤销，优化无法收敛
    #[error("优化器迭代次数超限: 已迭代 {iterations} 次 (上限 {limit})")]
    IterationLimitExceeded { iterations: usize, limit: usize },

    /// 规则名称重复，注册阶段即失败
    #[error("规则名称重复: {0}")]
    DuplicateRuleName(String),

    /// 规则应用过程中的计划图错误
    #[error("计划图错误: {0}")]
    Plan(#[from] PlanError),

    /// 规则读取索引信息时的存储错误，原样传播
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    /// 规则应用错误
    #[error("规则应用错误: {0}")]
    RuleApplicationError(String),

    /// 内部优化错误
    #[error("内部优化错误: {0}")]
    InternalError(String),
}

impl OptimizeError {
    pub fn rule_application(msg: impl Into<String>) -> Self {
        Self::RuleApplicationError(msg.into())
    }
}

impl ToPublicError for OptimizeError {
    fn error_code(&self) -> ErrorCode {
        match self {
            OptimizeError::IterationLimitExceeded { .. } => {
                ErrorCode::OptimizerIterationLimitExceeded
            }
            OptimizeError::DuplicateRuleName(_) => ErrorCode::DuplicateRuleName,
            OptimizeError::Plan(e) => e.error_code(),
            OptimizeError::Storage(e) => e.error_code(),
            OptimizeError::RuleApplicationError(_) | OptimizeError::InternalError(_) => {
                ErrorCode::Internal
            }
        }
    }
}

/// 优化器结果类型
pub type OptimizeResult<T> = Result<T, OptimizeError>;

/// 代价计算相关错误
#[derive(Error, Debug, Clone)]
pub enum CostError {
    /// 计划中引用的节点不存在
    #[error("缺少节点: {0}")]
    MissingNode(String),

    /// 缺少统计信息
    #[error("缺少统计信息: {0}")]
    MissingStatistics(String),
}

/// 代价计算结果类型
pub type CostResult<T> = Result<T, CostError>;

impl From<CostError> for OptimizeError {
    fn from(err: CostError) -> Self {
        OptimizeError::InternalError(err.to_string())
    }
}
