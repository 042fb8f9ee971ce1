//! 重写规则 trait 定义
//!
//! 规则是纯函数：读取输入计划，在副本上完成全部修改，成功后才把副本放进
//! `TransformResult`。前置条件不满足时返回 `TransformResult::unchanged()`，
//! 不产生部分修改。
//!
//! # 示例
//! ```rust
//! use aql_optimizer::query::planner::plan::{ExecutionPlan, PlanNodeType};
//! use aql_optimizer::query::planner::rewrite::{
//!     Pattern, RewriteContext, RewriteResult, RewriteRule, TransformResult,
//! };
//!
//! #[derive(Debug)]
//! struct NoopRule;
//!
//! impl RewriteRule for NoopRule {
//!     fn name(&self) -> &'static str { "noop" }
//!
//!     fn pattern(&self) -> Pattern {
//!         Pattern::new_with_type(PlanNodeType::Filter)
//!     }
//!
//!     fn apply(&self, _ctx: &mut RewriteContext, _plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
//!         Ok(TransformResult::unchanged())
//!     }
//! }
//! ```

use crate::query::planner::plan::ExecutionPlan;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

/// 重写规则 trait
pub trait RewriteRule: std::fmt::Debug + Send + Sync {
    /// 规则名称，出现在 explain 的 `rules` 列表与规则过滤器中
    fn name(&self) -> &'static str;

    /// 适用性预检
    fn pattern(&self) -> Pattern;

    /// 应用规则
    fn apply(&self, ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult>;

    fn matches(&self, plan: &ExecutionPlan) -> bool {
        self.pattern().matches(plan)
    }
}
