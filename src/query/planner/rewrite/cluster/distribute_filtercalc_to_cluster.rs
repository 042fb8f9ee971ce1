//! 计算与过滤下发到分片
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateCollection -> Remote(coordinator) -> Gather -> Calculation -> Filter -> Return
//! ```
//!
//! After:
//! ```text
//!   EnumerateCollection -> Calculation -> Filter -> Remote(coordinator) -> Gather -> Return
//! ```
//!
//! 只移动紧跟在 Gather 之后的确定性计算与过滤，相对顺序不变。

use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::cluster::coordinator_remote;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把 Gather 之后的计算与过滤移到分片上执行
    name: DistributeFilterCalcToClusterRule,
    rule_name: "distribute-filtercalc-to-cluster",
    pattern: Pattern::new_with_type(PlanNodeType::Gather)
        .and_any(vec![PlanNodeType::Calculation, PlanNodeType::Filter]),
    apply: distribute_filtercalc_to_cluster
}

fn is_movable(kind: &PlanNodeKind) -> bool {
    match kind {
        PlanNodeKind::Calculation { expression, .. } => expression.is_deterministic(),
        PlanNodeKind::Filter { .. } => true,
        _ => false,
    }
}

fn distribute_filtercalc_to_cluster(
    _ctx: &mut RewriteContext,
    plan: &ExecutionPlan,
) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for gather in plan.find_nodes(PlanNodeType::Gather) {
        let Some(remote) = coordinator_remote(&result, gather) else {
            continue;
        };
        while let Some(next) = result.dependent(gather) {
            if !result.kind(next).map(is_movable).unwrap_or(false) {
                break;
            }
            result.move_before(next, remote)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
