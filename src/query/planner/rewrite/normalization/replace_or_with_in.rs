//! OR 改写为 IN 的规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   FILTER doc.a == 1 || doc.a == 2 || doc.a IN [2, 3]
//! ```
//!
//! After:
//! ```text
//!   FILTER doc.a IN [1, 2, 3]
//! ```
//!
//! # 适用条件
//!
//! - 条件顶层是 OR，每个析取项都是 `X == 字面量`、`字面量 == X` 或 `X IN [字面量...]`
//! - 所有析取项的 X 相同，且 X 是确定性的非常量表达式

use crate::core::types::expression::Expression;
use crate::core::types::operators::ComparisonOperator;
use crate::core::Value;
use crate::define_rewrite_rule;
use crate::expression::condition;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::expression_utils::{comparison_parts, dedup_values, literal_array};
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{filter_condition, set_expression};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把同一表达式上的等值析取合并成一个 IN 比较
    name: ReplaceOrWithInRule,
    rule_name: "replace-or-with-in",
    pattern: Pattern::new_with_type(PlanNodeType::Filter),
    apply: replace_or_with_in
}

/// 单个析取项拆成 (X, 候选值)
fn equality_values(expression: &Expression) -> Option<(&Expression, Vec<Value>)> {
    let parts = comparison_parts(expression)?;
    match parts.op {
        ComparisonOperator::Eq => match (parts.left.as_literal(), parts.right.as_literal()) {
            (None, Some(value)) => Some((parts.left, vec![value.clone()])),
            (Some(value), None) => Some((parts.right, vec![value.clone()])),
            _ => None,
        },
        ComparisonOperator::In if parts.left.as_literal().is_none() => {
            Some((parts.left, literal_array(parts.right)?))
        }
        _ => None,
    }
}

/// 整个条件改写后的 IN 表达式
pub(crate) fn rewrite_disjunction(expression: &Expression) -> Option<Expression> {
    let parts = condition::disjuncts(expression);
    if parts.len() < 2 {
        return None;
    }
    let mut subject: Option<&Expression> = None;
    let mut values = Vec::new();
    for part in &parts {
        let (x, part_values) = equality_values(part)?;
        match subject {
            Some(s) if s != x => return None,
            Some(_) => {}
            None => {
                if !x.is_deterministic() || x.is_constant() {
                    return None;
                }
                subject = Some(x);
            }
        }
        values.extend(part_values);
    }
    let subject = subject?;
    let items = dedup_values(values).into_iter().map(Expression::literal).collect();
    Some(Expression::compare(
        subject.clone(),
        ComparisonOperator::In,
        Expression::array(items),
    ))
}

fn replace_or_with_in(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;
    for filter in plan.find_nodes(PlanNodeType::Filter) {
        let Some((calc, _, expression)) = filter_condition(plan, filter) else {
            continue;
        };
        if let Some(rewritten) = rewrite_disjunction(expression) {
            set_expression(&mut result, calc, rewritten)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
