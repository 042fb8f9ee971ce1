//! 冗余 OR 消除规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   FILTER doc.a < 5 || doc.a <= 7 || 3 > doc.a
//! ```
//!
//! After:
//! ```text
//!   FILTER doc.a <= 7
//! ```
//!
//! 所有析取项都是同一表达式与字面量的同向范围比较时（都是 `<`/`<=`，或都是 `>`/`>=`），
//! 析取的结果等于其中最宽的那个比较。边界值相同时取包含边界的操作符。

use std::cmp::Ordering;

use crate::core::types::expression::Expression;
use crate::core::types::operators::ComparisonOperator;
use crate::core::value::compare_values;
use crate::core::Value;
use crate::define_rewrite_rule;
use crate::expression::condition;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::expression_utils::compare_with_literal;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{filter_condition, set_expression};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 同向范围比较的析取只保留最宽的一项
    name: RemoveRedundantOrRule,
    rule_name: "remove-redundant-or",
    pattern: Pattern::new_with_type(PlanNodeType::Filter),
    apply: remove_redundant_or
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Upper,
    Lower,
}

fn bound_of(op: ComparisonOperator) -> Option<Bound> {
    match op {
        ComparisonOperator::Lt | ComparisonOperator::Le => Some(Bound::Upper),
        ComparisonOperator::Gt | ComparisonOperator::Ge => Some(Bound::Lower),
        _ => None,
    }
}

/// `candidate` 是否比 `current` 更宽
fn is_wider(bound: Bound, candidate: (ComparisonOperator, &Value), current: (ComparisonOperator, &Value)) -> bool {
    let inclusive = |op: ComparisonOperator| matches!(op, ComparisonOperator::Le | ComparisonOperator::Ge);
    match (bound, compare_values(candidate.1, current.1)) {
        (_, Ordering::Equal) => inclusive(candidate.0) && !inclusive(current.0),
        (Bound::Upper, ordering) => ordering == Ordering::Greater,
        (Bound::Lower, ordering) => ordering == Ordering::Less,
    }
}

pub(crate) fn widest_comparison(expression: &Expression) -> Option<Expression> {
    let parts = condition::disjuncts(expression);
    if parts.len() < 2 {
        return None;
    }
    let mut subject: Option<&Expression> = None;
    let mut bound: Option<Bound> = None;
    let mut widest: Option<(ComparisonOperator, &Value)> = None;

    for part in &parts {
        let (x, op, value) = compare_with_literal(part)?;
        let part_bound = bound_of(op)?;
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
        match bound {
            Some(b) if b != part_bound => return None,
            _ => bound = Some(part_bound),
        }
        widest = match widest {
            Some(current) if !is_wider(part_bound, (op, value), current) => Some(current),
            _ => Some((op, value)),
        };
    }

    let (op, value) = widest?;
    Some(Expression::compare(subject?.clone(), op, Expression::literal(value.clone())))
}

fn remove_redundant_or(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;
    for filter in plan.find_nodes(PlanNodeType::Filter) {
        let Some((calc, _, expression)) = filter_condition(plan, filter) else {
            continue;
        };
        if let Some(widest) = widest_comparison(expression) {
            set_expression(&mut result, calc, widest)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::VariableId;

    fn attr() -> Expression {
        Expression::attribute_path(VariableId(0), "a")
    }

    #[test]
    fn test_upper_bounds_keep_widest() {
        let expression = condition::disjunction(vec![
            Expression::lt(attr(), Expression::literal(5)),
            Expression::compare(attr(), ComparisonOperator::Le, Expression::literal(7)),
            Expression::gt(Expression::literal(3), attr()),
        ])
        .unwrap();
        assert_eq!(
            widest_comparison(&expression).unwrap(),
            Expression::compare(attr(), ComparisonOperator::Le, Expression::literal(7))
        );
    }

    #[test]
    fn test_equal_bounds_prefer_inclusive() {
        let expression = Expression::or(
            Expression::gt(attr(), Expression::literal(4)),
            Expression::compare(attr(), ComparisonOperator::Ge, Expression::literal(4)),
        );
        assert_eq!(
            widest_comparison(&expression).unwrap(),
            Expression::compare(attr(), ComparisonOperator::Ge, Expression::literal(4))
        );
    }

    #[test]
    fn test_mixed_directions_are_kept() {
        let expression = Expression::or(
            Expression::gt(attr(), Expression::literal(4)),
            Expression::lt(attr(), Expression::literal(1)),
        );
        assert!(widest_comparison(&expression).is_none());
    }
}
