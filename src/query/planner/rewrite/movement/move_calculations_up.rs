//! 计算上移规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateCollection(doc IN c)
//!       |
//!   Calculation(t = 1 + 2)
//! ```
//!
//! After:
//! ```text
//!   Calculation(t = 1 + 2)
//!       |
//!   EnumerateCollection(doc IN c)
//! ```
//!
//! 不依赖循环变量的计算只需执行一次，而不是每行一次。

use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::movement::topmost_crossable_enumeration;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::calculation_parts;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把不依赖循环变量的确定性计算移到循环之前
    name: MoveCalculationsUpRule,
    rule_name: "move-calculations-up",
    pattern: Pattern::new_with_type(PlanNodeType::Calculation),
    apply: move_calculations_up
}

fn move_calculations_up(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for calc in plan.find_nodes(PlanNodeType::Calculation) {
        let Some((_, expression)) = calculation_parts(&result, calc) else {
            continue;
        };
        if !expression.is_deterministic() || expression.can_throw() {
            continue;
        }
        let used: Vec<_> = expression.variables().into_iter().collect();
        let target = topmost_crossable_enumeration(&result, calc, &used, |_, _| true);
        if let Some(target) = target {
            result.move_before(calc, target)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
