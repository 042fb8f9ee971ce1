//! 重复计算消除规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Calculation(a = doc.x + 1)
//!       |
//!   Filter(...)
//!       |
//!   Calculation(b = doc.x + 1)
//!       |
//!   Return(b)
//! ```
//!
//! After:
//! ```text
//!   Calculation(a = doc.x + 1)
//!       |
//!   Filter(...)
//!       |
//!   Return(a)
//! ```
//!
//! 只在同一条链上向上查找，遇到 Collect 停止（Collect 之后原来的行已经不存在）。

use std::collections::HashMap;

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::calculation_parts;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 用上游的等价计算替换重复的确定性计算
    name: RemoveRedundantCalculationsRule,
    rule_name: "remove-redundant-calculations",
    pattern: Pattern::new_with_type(PlanNodeType::Calculation),
    apply: remove_redundant_calculations
}

/// 上游与 `calc` 表达式相同的确定性计算
fn equivalent_upstream(plan: &ExecutionPlan, calc: NodeId) -> Option<NodeId> {
    let (_, expression) = calculation_parts(plan, calc)?;
    let mut current = plan.dependency(calc);
    while let Some(id) = current {
        match plan.kind(id)? {
            PlanNodeKind::Collect { .. } => return None,
            PlanNodeKind::Calculation {
                expression: upstream,
                ..
            } if upstream == expression => return Some(id),
            _ => {}
        }
        current = plan.dependency(id);
    }
    None
}

fn remove_redundant_calculations(
    _ctx: &mut RewriteContext,
    plan: &ExecutionPlan,
) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for calc in plan.find_nodes(PlanNodeType::Calculation) {
        let Some((out, expression)) = calculation_parts(&result, calc) else {
            continue;
        };
        if !expression.is_deterministic() {
            continue;
        }
        let Some(upstream) = equivalent_upstream(&result, calc) else {
            continue;
        };
        let Some((kept, _)) = calculation_parts(&result, upstream) else {
            continue;
        };

        let mut replacements = HashMap::new();
        replacements.insert(out, kept);
        result.replace_variables(&replacements);
        result.remove_node(calc)?;
        changed = true;
    }
    Ok(TransformResult::from_plan(changed, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::expression::Expression;
    use crate::query::planner::plan::PlanBuilder;
    use crate::query::planner::rewrite::rule::RewriteRule;

    #[test]
    fn test_duplicate_is_replaced() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let a = builder.let_("a", Expression::add(Expression::attribute_path(doc, "x"), Expression::literal(1)));
        builder.filter(Expression::gt(Expression::reference(a), Expression::literal(0)));
        let b = builder.let_("b", Expression::add(Expression::attribute_path(doc, "x"), Expression::literal(1)));
        builder.return_(Expression::reference(b));
        let plan = builder.build().unwrap();

        let result = RemoveRedundantCalculationsRule::new()
            .apply(&mut RewriteContext::new(), &plan)
            .unwrap();
        assert!(result.changed);
        let plan = &result.plans[0];
        plan.validate().unwrap();
        assert!(plan.variable_setter(b).is_none());
        let root = plan.root().unwrap();
        assert_eq!(plan.kind(root), Some(&PlanNodeKind::Return { input: a }));
    }

    #[test]
    fn test_collect_blocks_reuse() {
        let mut builder = PlanBuilder::new();
        let i = builder.for_list(Expression::array(vec![Expression::literal(1)]), "i");
        builder.let_("a", Expression::literal(5));
        let vars = builder.collect(vec![("g", Expression::reference(i))], vec![], None);
        let b = builder.let_("b", Expression::literal(5));
        builder.return_(Expression::add(Expression::reference(vars.groups[0]), Expression::reference(b)));
        let plan = builder.build().unwrap();

        let result = RemoveRedundantCalculationsRule::new()
            .apply(&mut RewriteContext::new(), &plan)
            .unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_nondeterministic_is_kept() {
        let mut builder = PlanBuilder::new();
        builder.let_("a", Expression::function("RAND", vec![]));
        let b = builder.let_("b", Expression::function("RAND", vec![]));
        builder.return_(Expression::reference(b));
        let plan = builder.build().unwrap();
        let result = RemoveRedundantCalculationsRule::new()
            .apply(&mut RewriteContext::new(), &plan)
            .unwrap();
        assert!(!result.changed);
    }
}
