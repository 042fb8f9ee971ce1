//! `SORT RAND()` 消除规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateCollection(doc IN c)
//!       |
//!   Calculation(r = RAND())
//!       |
//!   Sort(r)
//! ```
//!
//! After:
//! ```text
//!   EnumerateCollection(doc IN c, random)
//! ```
//!
//! # 适用条件
//!
//! - 排序只有一个条件，它的计算是无参数的 `RAND()`
//! - 计划中只有一个集合迭代，且没有 Filter、Collect、Subquery、列表迭代、索引迭代与图遍历
//! - 集合迭代与排序之间只有计算，且除 `RAND()` 外都不会抛错

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::expression_utils::is_rand_call;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{calculation_of, calculation_parts, usage_count};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

/// 出现任一类型就不做改写
const DISQUALIFYING_NODES: [PlanNodeType; 7] = [
    PlanNodeType::Filter,
    PlanNodeType::Collect,
    PlanNodeType::Subquery,
    PlanNodeType::EnumerateList,
    PlanNodeType::Index,
    PlanNodeType::Traversal,
    PlanNodeType::ShortestPath,
];

define_rewrite_rule! {
    /// 把按 `RAND()` 排序改为随机顺序迭代集合
    name: RemoveSortRandRule,
    rule_name: "remove-sort-rand",
    pattern: Pattern::new_with_type(PlanNodeType::Sort).and_type(PlanNodeType::EnumerateCollection),
    apply: remove_sort_rand
}

/// 满足条件时返回 (集合迭代节点, RAND 计算节点)
fn match_sort(plan: &ExecutionPlan, sort: NodeId) -> Option<(NodeId, NodeId)> {
    let element = match plan.kind(sort)? {
        PlanNodeKind::Sort { elements, .. } if elements.len() == 1 => elements[0],
        _ => return None,
    };
    let (rand_calc, expression) = calculation_of(plan, element.variable)?;
    if !is_rand_call(expression) {
        return None;
    }

    let mut current = plan.dependency(sort);
    while let Some(id) = current {
        match plan.kind(id)? {
            PlanNodeKind::Calculation { expression, .. } => {
                if id != rand_calc && expression.can_throw() {
                    return None;
                }
            }
            PlanNodeKind::EnumerateCollection { random: false, .. } => return Some((id, rand_calc)),
            _ => return None,
        }
        current = plan.dependency(id);
    }
    None
}

fn remove_sort_rand(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let present = plan.node_types();
    if DISQUALIFYING_NODES.iter().any(|t| present.contains(t)) {
        return Ok(TransformResult::unchanged());
    }
    if plan.find_nodes(PlanNodeType::EnumerateCollection).len() != 1 {
        return Ok(TransformResult::unchanged());
    }

    for sort in plan.find_nodes(PlanNodeType::Sort) {
        let Some((enumeration, rand_calc)) = match_sort(plan, sort) else {
            continue;
        };
        let mut result = plan.clone();
        if let PlanNodeKind::EnumerateCollection { random, .. } = &mut result.get_mut(enumeration)?.kind {
            *random = true;
        }
        result.remove_node(sort)?;
        // 排序删除后 RAND() 计算不再被读取
        if let Some((out, _)) = calculation_parts(&result, rand_calc) {
            if usage_count(&result, out) == 0 {
                result.remove_node(rand_calc)?;
            }
        }
        return Ok(TransformResult::changed(result));
    }
    Ok(TransformResult::unchanged())
}
