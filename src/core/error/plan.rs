//! 计划图错误类型
//!
//! 计划图 API 的契约违例，属于编程错误，对当前优化调用是致命的，不做重试。

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};
use crate::core::types::NodeId;

/// 计划图操作错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// 依赖节点不存在，或新增依赖会形成环
    #[error("无效依赖: 节点 {node} -> {dependency}")]
    InvalidDependency { node: NodeId, dependency: NodeId },

    /// 被替换的节点仍被无法迁移的位置引用
    #[error("悬空引用: 节点 {0} 仍被引用")]
    DanglingReference(NodeId),

    /// 节点有多个下游，删除会产生歧义
    #[error("节点 {0} 有多个下游节点，无法删除")]
    NodeHasMultipleDependents(NodeId),

    /// 节点没有依赖，无法从链中摘除
    #[error("节点 {0} 没有依赖，无法删除")]
    NodeWithoutDependency(NodeId),

    /// 节点不存在
    #[error("节点不存在: {0}")]
    NodeNotFound(NodeId),

    /// 计划结构无效
    #[error("无效的计划结构: {0}")]
    InvalidPlanStructure(String),
}

impl PlanError {
    pub fn invalid_plan_structure(msg: impl Into<String>) -> Self {
        Self::InvalidPlanStructure(msg.into())
    }
}

impl ToPublicError for PlanError {
    fn error_code(&self) -> ErrorCode {
        match self {
            PlanError::InvalidDependency { .. } => ErrorCode::InvalidDependency,
            PlanError::DanglingReference(_) => ErrorCode::DanglingReference,
            PlanError::NodeHasMultipleDependents(_) => ErrorCode::NodeHasMultipleDependents,
            PlanError::NodeWithoutDependency(_) | PlanError::NodeNotFound(_) => {
                ErrorCode::NodeNotFound
            }
            PlanError::InvalidPlanStructure(_) => ErrorCode::QueryParse,
        }
    }
}

/// 计划图操作结果类型
pub type PlanResult<T> = Result<T, PlanError>;
