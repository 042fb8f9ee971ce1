//! 排序下发到分片
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Calculation(t) -> Remote(coordinator) -> Gather -> Sort(t ASC)
//! ```
//!
//! After:
//! ```text
//!   Calculation(t) -> Sort(t ASC) -> Remote(coordinator) -> Gather(t ASC)
//! ```
//!
//! 每个分片各自排序，Gather 按同样的条件归并。只处理还没有归并条件的 Gather。

use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType, SortPath};
use crate::query::planner::rewrite::cluster::coordinator_remote;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把 Gather 之后的排序移到分片上，Gather 改为有序归并
    name: DistributeSortToClusterRule,
    rule_name: "distribute-sort-to-cluster",
    pattern: Pattern::new_with_type(PlanNodeType::Gather).and_type(PlanNodeType::Sort),
    apply: distribute_sort_to_cluster
}

fn distribute_sort_to_cluster(
    _ctx: &mut RewriteContext,
    plan: &ExecutionPlan,
) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for gather in plan.find_nodes(PlanNodeType::Gather) {
        match result.kind(gather) {
            Some(PlanNodeKind::Gather { elements }) if elements.is_empty() => {}
            _ => continue,
        }
        let Some(remote) = coordinator_remote(&result, gather) else {
            continue;
        };
        let Some(sort) = result.dependent(gather) else {
            continue;
        };
        let merge: Vec<SortPath> = match result.kind(sort) {
            Some(PlanNodeKind::Sort { elements, .. }) => elements
                .iter()
                .map(|e| SortPath::new(e.variable, Vec::new(), e.ascending))
                .collect(),
            _ => continue,
        };
        result.move_before(sort, remote)?;
        if let PlanNodeKind::Gather { elements } = &mut result.get_mut(gather)?.kind {
            *elements = merge;
        }
        changed = true;
    }
    Ok(TransformResult::from_plan(changed, result))
}
