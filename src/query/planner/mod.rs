//! 执行计划与计划重写
//!
//! - `plan`：计划图模型、构建器与 explain 输出
//! - `rewrite`：重写规则与规则调度

pub mod plan;
pub mod rewrite;

pub use plan::{ExecutionPlan, PlanBuilder, PlanDescription, PlanNode, PlanNodeKind, PlanNodeType};
pub use rewrite::{PlanRewriter, RewriteContext, RuleFilter, RuleRegistry, RuleSelection};
