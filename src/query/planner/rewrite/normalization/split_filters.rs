//! 过滤拆分规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Calculation(t = a && b && c)
//!       |
//!   Filter(t)
//! ```
//!
//! After:
//! ```text
//!   Calculation(t = a)  Filter(t)  Calculation(t1 = b)  Filter(t1)  Calculation(t2 = c)  Filter(t2)
//! ```
//!
//! 拆开后每个合取项都可以独立上移，或被索引覆盖后单独删除。
//! 条件变量还被其他节点读取时不拆分。

use crate::define_rewrite_rule;
use crate::expression::condition;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{filter_condition, is_used_elsewhere, set_expression};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把顶层 AND 条件拆成一串过滤节点
    name: SplitFiltersRule,
    rule_name: "split-filters",
    pattern: Pattern::new_with_type(PlanNodeType::Filter),
    apply: split_filters
}

fn split_filters(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for filter in plan.find_nodes(PlanNodeType::Filter) {
        let Some((calc, input, expression)) = filter_condition(plan, filter) else {
            continue;
        };
        if is_used_elsewhere(plan, input, filter) {
            continue;
        }
        let mut parts = condition::conjuncts(expression).into_iter();
        let Some(first) = parts.next() else {
            continue;
        };
        let rest: Vec<_> = parts.collect();
        if rest.is_empty() {
            continue;
        }

        set_expression(&mut result, calc, first)?;
        let mut after = filter;
        for part in rest {
            let out = result.variables_mut().create_temporary();
            let calc = result.insert_after(
                after,
                PlanNodeKind::Calculation {
                    out,
                    expression: part,
                },
            )?;
            after = result.insert_after(calc, PlanNodeKind::Filter { input: out })?;
        }
        changed = true;
    }
    Ok(TransformResult::from_plan(changed, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::expression::Expression;
    use crate::query::planner::plan::{PlanBuilder, WalkOrder};
    use crate::query::planner::rewrite::rule::RewriteRule;

    #[test]
    fn test_conjunction_becomes_filter_chain() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::and(
            Expression::eq(Expression::attribute_path(doc, "a"), Expression::literal(1)),
            Expression::gt(Expression::attribute_path(doc, "b"), Expression::literal(2)),
        ));
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let result = SplitFiltersRule::new().apply(&mut RewriteContext::new(), &plan).unwrap();
        assert!(result.changed);
        let plan = &result.plans[0];
        plan.validate().unwrap();
        let types: Vec<PlanNodeType> = plan.walk(WalkOrder::Dependency).map(|n| n.node_type()).collect();
        assert_eq!(
            types,
            vec![
                PlanNodeType::Singleton,
                PlanNodeType::EnumerateCollection,
                PlanNodeType::Calculation,
                PlanNodeType::Filter,
                PlanNodeType::Calculation,
                PlanNodeType::Filter,
                PlanNodeType::Return,
            ]
        );

        let again = SplitFiltersRule::new().apply(&mut RewriteContext::new(), plan).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_shared_condition_is_not_split() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let cond = builder.let_(
            "cond",
            Expression::and(
                Expression::eq(Expression::attribute_path(doc, "a"), Expression::literal(1)),
                Expression::eq(Expression::attribute_path(doc, "b"), Expression::literal(2)),
            ),
        );
        builder.filter(Expression::reference(cond));
        builder.return_(Expression::reference(cond));
        let plan = builder.build().unwrap();

        let result = SplitFiltersRule::new().apply(&mut RewriteContext::new(), &plan).unwrap();
        assert!(!result.changed);
    }
}
