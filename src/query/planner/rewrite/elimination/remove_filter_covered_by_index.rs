//! 删除被索引条件覆盖的过滤
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Index(doc IN c, value < 10)
//!       |
//!   Calculation(t = doc.value < 10 && doc.flag == true)
//!       |
//!   Filter(t)
//! ```
//!
//! After:
//! ```text
//!   Index(doc IN c, value < 10)
//!       |
//!   Calculation(t = doc.flag == true)
//!       |
//!   Filter(t)
//! ```
//!
//! 索引查找按与过滤相同的比较语义匹配文档，所以和某个索引子句完全相同的合取项可以删除。
//! 全部合取项都被覆盖时删除整个过滤；条件变量还被其他节点读取时只做整体删除，不改写表达式。

use crate::core::types::expression::Expression;
use crate::core::types::{NodeId, VariableId};
use crate::define_rewrite_rule;
use crate::expression::condition;
use crate::index::{IndexClause, IndexCondition};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{
    downstream_until, ends_filter_scope, filter_condition, is_used_elsewhere,
    remove_calculation_if_unused, set_expression,
};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 删除索引条件已经保证的过滤合取项
    name: RemoveFilterCoveredByIndexRule,
    rule_name: "remove-filter-covered-by-index",
    pattern: Pattern::new_with_type(PlanNodeType::Index).and_type(PlanNodeType::Filter),
    apply: remove_filter_covered_by_index
}

/// 合取项与某个索引子句等价（允许左右交换的写法）
fn clause_covers(clause: &IndexClause, variable: VariableId, expression: &Expression) -> bool {
    if &clause.to_expression(variable) == expression {
        return true;
    }
    match clause.op.reverse() {
        Some(reversed) => {
            let swapped = Expression::compare(
                clause.value.clone(),
                reversed,
                Expression::attribute_path(variable, &clause.dotted_path()),
            );
            &swapped == expression
        }
        None => false,
    }
}

fn is_covered(condition: &IndexCondition, variable: VariableId, expression: &Expression) -> bool {
    condition
        .clauses
        .iter()
        .any(|clause| clause_covers(clause, variable, expression))
}

fn process_filter(
    plan: &mut ExecutionPlan,
    filter: NodeId,
    condition: &IndexCondition,
    variable: VariableId,
) -> RewriteResult<bool> {
    let Some((calc, input, expression)) = filter_condition(plan, filter) else {
        return Ok(false);
    };
    let parts = condition::conjuncts(expression);
    let residual: Vec<Expression> = parts
        .iter()
        .filter(|part| !is_covered(condition, variable, part))
        .cloned()
        .collect();
    if residual.len() == parts.len() {
        return Ok(false);
    }

    match condition::conjunction(residual) {
        None => {
            plan.remove_node(filter)?;
            remove_calculation_if_unused(plan, calc)?;
            Ok(true)
        }
        Some(rest) => {
            if is_used_elsewhere(plan, input, filter) {
                return Ok(false);
            }
            set_expression(plan, calc, rest)?;
            Ok(true)
        }
    }
}

fn remove_filter_covered_by_index(
    _ctx: &mut RewriteContext,
    plan: &ExecutionPlan,
) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for index_node in plan.find_nodes(PlanNodeType::Index) {
        let (out, condition) = match plan.kind(index_node) {
            Some(PlanNodeKind::Index { out, condition, .. }) if !condition.is_empty() => (*out, condition),
            _ => continue,
        };
        for id in downstream_until(plan, index_node, ends_filter_scope) {
            if plan.node_type(id) == Some(PlanNodeType::Filter) && result.contains(id) {
                changed |= process_filter(&mut result, id, condition, out)?;
            }
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::operators::ComparisonOperator;
    use crate::index::IndexDescriptor;
    use crate::index::IndexType;
    use crate::query::planner::plan::PlanBuilder;
    use crate::query::planner::rewrite::rule::RewriteRule;

    /// 把计划中的集合迭代换成带给定条件的索引迭代
    fn with_index(plan: &mut ExecutionPlan, clauses: Vec<IndexClause>) {
        let scan = plan.find_nodes(PlanNodeType::EnumerateCollection)[0];
        let out = match plan.kind(scan) {
            Some(PlanNodeKind::EnumerateCollection { out, .. }) => *out,
            _ => unreachable!(),
        };
        let index = IndexDescriptor::new("c/1", "c", IndexType::Persistent, vec!["value".into()]);
        let node = plan
            .create_node(
                PlanNodeKind::Index {
                    collection: "c".into(),
                    out,
                    index,
                    condition: IndexCondition::new(clauses),
                    reverse: false,
                    ordered: Vec::new(),
                },
                None,
            )
            .unwrap();
        plan.replace_node(scan, node).unwrap();
    }

    #[test]
    fn test_fully_covered_filter_is_removed() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::gt(Expression::literal(10), Expression::attribute_path(doc, "value")));
        builder.return_(Expression::reference(doc));
        let mut plan = builder.build().unwrap();
        with_index(
            &mut plan,
            vec![IndexClause::new(vec!["value".into()], ComparisonOperator::Lt, Expression::literal(10))],
        );

        let result = RemoveFilterCoveredByIndexRule::new()
            .apply(&mut RewriteContext::new(), &plan)
            .unwrap();
        assert!(result.changed);
        let plan = &result.plans[0];
        plan.validate().unwrap();
        assert!(!plan.contains_node_type(PlanNodeType::Filter));
        assert!(!plan.contains_node_type(PlanNodeType::Calculation));
    }

    #[test]
    fn test_partially_covered_filter_keeps_residual() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let flag = Expression::eq(Expression::attribute_path(doc, "flag"), Expression::literal(true));
        builder.filter(Expression::and(
            Expression::lt(Expression::attribute_path(doc, "value"), Expression::literal(10)),
            flag.clone(),
        ));
        builder.return_(Expression::reference(doc));
        let mut plan = builder.build().unwrap();
        with_index(
            &mut plan,
            vec![IndexClause::new(vec!["value".into()], ComparisonOperator::Lt, Expression::literal(10))],
        );

        let result = RemoveFilterCoveredByIndexRule::new()
            .apply(&mut RewriteContext::new(), &plan)
            .unwrap();
        let plan = &result.plans[0];
        let filter = plan.find_nodes(PlanNodeType::Filter)[0];
        let (_, _, expression) = filter_condition(plan, filter).unwrap();
        assert_eq!(expression, &flag);
    }
}
