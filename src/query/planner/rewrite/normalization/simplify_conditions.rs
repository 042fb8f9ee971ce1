//! 条件折叠规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   LET c = (a == 1 && b == 2) && c == 3
//! ```
//!
//! After:
//! ```text
//!   LET c = a == 1 && (b == 2 && c == 3)
//! ```
//!
//! 已经是右折叠形式的条件保持不变，例如 `b == 1 || (a == 1 || b == 2)`。

use crate::define_rewrite_rule;
use crate::expression::condition;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{calculation_parts, set_expression};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 展平嵌套的同类逻辑运算，下推 NOT，再写回右折叠的二元形式
    name: SimplifyConditionsRule,
    rule_name: "simplify-conditions",
    pattern: Pattern::new_with_type(PlanNodeType::Calculation),
    apply: simplify_conditions
}

fn simplify_conditions(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;
    for calc in plan.find_nodes(PlanNodeType::Calculation) {
        let Some((_, expression)) = calculation_parts(plan, calc) else {
            continue;
        };
        let collapsed = condition::collapse(expression.clone());
        if &collapsed != expression {
            set_expression(&mut result, calc, collapsed)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
