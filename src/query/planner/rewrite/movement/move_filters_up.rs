//! 过滤上移规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Calculation(t = x.v > 1)
//!       |
//!   EnumerateCollection(y IN b)
//!       |
//!   Filter(t)
//! ```
//!
//! After:
//! ```text
//!   Calculation(t = x.v > 1)
//!       |
//!   Filter(t)
//!       |
//!   EnumerateCollection(y IN b)
//! ```
//!
//! 过滤越过内层循环后，被过滤掉的外层行不再驱动内层循环。
//! 只越过循环节点与确定性、不抛错的计算。

use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::movement::topmost_crossable_enumeration;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把过滤移到与其条件无关的循环之前
    name: MoveFiltersUpRule,
    rule_name: "move-filters-up",
    pattern: Pattern::new_with_type(PlanNodeType::Filter),
    apply: move_filters_up
}

fn move_filters_up(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for filter in plan.find_nodes(PlanNodeType::Filter) {
        let input = match result.kind(filter) {
            Some(PlanNodeKind::Filter { input }) => *input,
            _ => continue,
        };
        let target = topmost_crossable_enumeration(&result, filter, &[input], |_, kind| {
            matches!(kind, PlanNodeKind::Calculation { expression, .. }
                if expression.is_deterministic() && !expression.can_throw())
        });
        if let Some(target) = target {
            result.move_before(filter, target)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
