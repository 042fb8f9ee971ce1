//! 重写结果定义

use crate::core::error::{OptimizeError, PlanError, StorageError};
use crate::query::planner::plan::ExecutionPlan;

/// 重写错误类型
///
/// 前置条件不满足不是错误，规则应返回 `TransformResult::unchanged()`。
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("计划图错误: {0}")]
    Plan(#[from] PlanError),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("重写失败: {0}")]
    RewriteFailed(String),
}

impl RewriteError {
    pub fn rewrite_failed(msg: impl Into<String>) -> Self {
        Self::RewriteFailed(msg.into())
    }
}

impl From<RewriteError> for OptimizeError {
    fn from(err: RewriteError) -> Self {
        match err {
            RewriteError::Plan(e) => OptimizeError::Plan(e),
            RewriteError::Storage(e) => OptimizeError::Storage(e),
            RewriteError::RewriteFailed(msg) => OptimizeError::RuleApplicationError(msg),
        }
    }
}

/// 重写结果类型
pub type RewriteResult<T> = std::result::Result<T, RewriteError>;

/// 规则应用结果
///
/// `changed` 为 true 时 `plans[0]` 替换当前计划，其余为新的候选计划；
/// 为 false 时当前计划保持不变，`plans` 中只有候选计划（可以为空）。
#[derive(Debug, Default, Clone)]
pub struct TransformResult {
    pub changed: bool,
    pub plans: Vec<ExecutionPlan>,
}

impl TransformResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed(plan: ExecutionPlan) -> Self {
        Self {
            changed: true,
            plans: vec![plan],
        }
    }

    /// 在副本上改写完成后，按是否有改动返回
    pub fn from_plan(changed: bool, plan: ExecutionPlan) -> Self {
        if changed {
            Self::changed(plan)
        } else {
            Self::unchanged()
        }
    }

    /// 改写后的计划外加若干候选计划
    pub fn with_alternatives(plan: ExecutionPlan, alternatives: Vec<ExecutionPlan>) -> Self {
        let mut plans = Vec::with_capacity(alternatives.len() + 1);
        plans.push(plan);
        plans.extend(alternatives);
        Self {
            changed: true,
            plans,
        }
    }

    /// 当前计划不变，只派生候选计划
    pub fn alternatives(alternatives: Vec<ExecutionPlan>) -> Self {
        Self {
            changed: false,
            plans: alternatives,
        }
    }

    pub fn has_alternatives(&self) -> bool {
        if self.changed {
            self.plans.len() > 1
        } else {
            !self.plans.is_empty()
        }
    }

    /// 拆分为 (替换计划, 候选计划)
    pub fn split(self) -> (Option<ExecutionPlan>, Vec<ExecutionPlan>) {
        if !self.changed {
            return (None, self.plans);
        }
        let mut plans = self.plans.into_iter();
        let first = plans.next();
        (first, plans.collect())
    }
}
