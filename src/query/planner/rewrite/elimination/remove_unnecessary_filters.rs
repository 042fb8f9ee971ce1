//! 常量过滤消除规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Calculation(t = 1 < 2)     Calculation(t = 1 > 2)
//!       |                          |
//!   Filter(t)                  Filter(t)
//! ```
//!
//! After:
//! ```text
//!   Calculation(t = 1 < 2)     Calculation(t = 1 > 2)
//!                                  |
//!                              NoResults
//! ```
//!
//! 恒真的过滤直接删除；恒假的过滤替换为 NoResults，整个链不再产生任何行。
//! 条件计算本身留给 `remove-unnecessary-calculations` 清理。

use crate::core::value::to_bool;
use crate::core::WarningCollector;
use crate::define_rewrite_rule;
use crate::expression::ExpressionEvaluator;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::filter_condition;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 删除恒真过滤，把恒假过滤替换为 NoResults
    name: RemoveUnnecessaryFiltersRule,
    rule_name: "remove-unnecessary-filters",
    pattern: Pattern::new_with_type(PlanNodeType::Filter),
    apply: remove_unnecessary_filters
}

fn remove_unnecessary_filters(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for filter in plan.find_nodes(PlanNodeType::Filter) {
        let Some((_, _, expression)) = filter_condition(plan, filter) else {
            continue;
        };
        if !ExpressionEvaluator::can_fold(expression) {
            continue;
        }
        let mut warnings = WarningCollector::default();
        let Ok(value) = ExpressionEvaluator::evaluate_constant(expression, &mut warnings) else {
            continue;
        };

        if to_bool(&value) {
            result.remove_node(filter)?;
        } else {
            if result.subquery_with_root(filter).is_some() {
                continue;
            }
            let empty = result.create_node(PlanNodeKind::NoResults, None)?;
            result.replace_node(filter, empty)?;
        }
        changed = true;
    }
    Ok(TransformResult::from_plan(changed, result))
}
