//! 冗余排序消除规则
//!
//! 两种情况：
//!
//! 1. 按常量排序的条件没有作用，删除这些条件；一个条件都不剩时删除整个排序
//! 2. 两个排序之间只有计算和过滤（不改变行的相对顺序）时：
//!    - 前一个的条件是后一个的前缀，前一个排序的结果会被完全重排，删除前一个
//!    - 后一个的条件是前一个的前缀，数据已经按后一个的要求有序，删除后一个
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Sort(a ASC)
//!       |
//!   Filter(...)
//!       |
//!   Sort(a ASC, b DESC)
//! ```
//!
//! After:
//! ```text
//!   Filter(...)
//!       |
//!   Sort(a ASC, b DESC)
//! ```

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType, SortElement};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::calculation_of;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 删除按常量排序的条件和被覆盖的排序
    name: RemoveRedundantSortsRule,
    rule_name: "remove-redundant-sorts",
    pattern: Pattern::new_with_type(PlanNodeType::Sort),
    apply: remove_redundant_sorts
}

fn sort_elements(plan: &ExecutionPlan, id: NodeId) -> Option<&[SortElement]> {
    match plan.kind(id)? {
        PlanNodeKind::Sort { elements, .. } => Some(elements),
        _ => None,
    }
}

fn is_prefix(prefix: &[SortElement], of: &[SortElement]) -> bool {
    prefix.len() <= of.len() && prefix.iter().zip(of).all(|(a, b)| a == b)
}

/// 删除按常量排序的条件，返回是否有改动
fn drop_constant_elements(plan: &mut ExecutionPlan, sort: NodeId) -> RewriteResult<bool> {
    let Some(elements) = sort_elements(plan, sort) else {
        return Ok(false);
    };
    let kept: Vec<SortElement> = elements
        .iter()
        .filter(|e| !matches!(calculation_of(plan, e.variable), Some((_, expr)) if expr.is_constant()))
        .copied()
        .collect();
    if kept.len() == elements.len() {
        return Ok(false);
    }
    if kept.is_empty() {
        plan.remove_node(sort)?;
    } else if let PlanNodeKind::Sort { elements, .. } = &mut plan.get_mut(sort)?.kind {
        *elements = kept;
    }
    Ok(true)
}

/// 上游只隔着计算和过滤的排序
fn previous_sort(plan: &ExecutionPlan, sort: NodeId) -> Option<NodeId> {
    let mut current = plan.dependency(sort);
    while let Some(id) = current {
        match plan.node_type(id)? {
            PlanNodeType::Sort => return Some(id),
            PlanNodeType::Calculation | PlanNodeType::Filter => current = plan.dependency(id),
            _ => return None,
        }
    }
    None
}

fn remove_redundant_sorts(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    for sort in plan.find_nodes(PlanNodeType::Sort) {
        if result.contains(sort) {
            changed |= drop_constant_elements(&mut result, sort)?;
        }
    }

    for sort in plan.find_nodes(PlanNodeType::Sort) {
        if !result.contains(sort) {
            continue;
        }
        let Some(previous) = previous_sort(&result, sort) else {
            continue;
        };
        let (Some(later), Some(earlier)) = (sort_elements(&result, sort), sort_elements(&result, previous)) else {
            continue;
        };
        if is_prefix(later, earlier) {
            result.remove_node(sort)?;
            changed = true;
        } else if is_prefix(earlier, later) {
            result.remove_node(previous)?;
            changed = true;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
