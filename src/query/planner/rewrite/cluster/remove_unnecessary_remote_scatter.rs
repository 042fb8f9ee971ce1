//! 删除不必要的 Scatter 与 Remote
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Singleton -> Scatter -> Remote(dbservers) -> EnumerateCollection
//! ```
//!
//! After:
//! ```text
//!   Singleton -> EnumerateCollection
//! ```
//!
//! Scatter 把上游的行复制给每个分片。上游只有 Singleton 和确定性计算时，
//! 每个分片自己重新算一遍结果相同，分发这一步可以去掉。

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::cluster::DBSERVERS;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 上游只有常量部分时删除 Scatter 与分片侧 Remote
    name: RemoveUnnecessaryRemoteScatterRule,
    rule_name: "remove-unnecessary-remote-scatter",
    pattern: Pattern::new_with_type(PlanNodeType::Scatter),
    apply: remove_unnecessary_remote_scatter
}

/// Scatter 上游只有 Singleton 与确定性计算
fn has_trivial_upstream(plan: &ExecutionPlan, scatter: NodeId) -> bool {
    let mut current = plan.dependency(scatter);
    while let Some(id) = current {
        let trivial = match plan.kind(id) {
            Some(PlanNodeKind::Singleton) => true,
            Some(PlanNodeKind::Calculation { expression, .. }) => expression.is_deterministic(),
            _ => false,
        };
        if !trivial {
            return false;
        }
        current = plan.dependency(id);
    }
    true
}

fn remove_unnecessary_remote_scatter(
    _ctx: &mut RewriteContext,
    plan: &ExecutionPlan,
) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for scatter in plan.find_nodes(PlanNodeType::Scatter) {
        let Some(remote) = result.dependent(scatter) else {
            continue;
        };
        let is_shard_remote = matches!(
            result.kind(remote),
            Some(PlanNodeKind::Remote { server, .. }) if server == DBSERVERS
        );
        if !is_shard_remote || !has_trivial_upstream(&result, scatter) {
            continue;
        }
        result.remove_node(remote)?;
        result.remove_node(scatter)?;
        changed = true;
    }
    Ok(TransformResult::from_plan(changed, result))
}
