//! 相邻循环交换规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateCollection(a IN c1)
//!       |
//!   EnumerateCollection(b IN c2)
//! ```
//!
//! Alternative:
//! ```text
//!   EnumerateCollection(b IN c2)
//!       |
//!   EnumerateCollection(a IN c1)
//! ```
//!
//! 当前计划保持不变，每个排列派生一个候选计划。只处理每条链上第一段
//! 长度至少为 2 的相邻循环；EnumerateList 的输入必须在这段循环之外产生。

use std::collections::HashSet;

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteError, RewriteResult, TransformResult};

/// 一段循环最多参与排列的节点数，5! = 120 种顺序
const MAX_RUN_LENGTH: usize = 5;

define_rewrite_rule! {
    /// 为相邻的独立循环生成全部嵌套顺序
    name: InterchangeAdjacentEnumerationsRule,
    rule_name: "interchange-adjacent-enumerations",
    pattern: Pattern::new_with_type(PlanNodeType::EnumerateCollection),
    apply: interchange_adjacent_enumerations
}

fn is_candidate(plan: &ExecutionPlan, id: NodeId) -> bool {
    matches!(
        plan.node_type(id),
        Some(PlanNodeType::EnumerateCollection) | Some(PlanNodeType::EnumerateList)
    )
}

/// 链上第一段可交换的相邻循环，依赖顺序
fn find_run(plan: &ExecutionPlan, terminal: NodeId) -> Option<Vec<NodeId>> {
    let chain = plan.chain(terminal);
    let mut start = 0;
    while start < chain.len() {
        if !is_candidate(plan, chain[start]) {
            start += 1;
            continue;
        }
        let mut end = start;
        while end + 1 < chain.len() && is_candidate(plan, chain[end + 1]) {
            end += 1;
        }
        let run = independent_prefix(plan, &chain[start..=end]);
        if run.len() >= 2 && plan.dependent(run[run.len() - 1]).is_some() {
            return Some(run);
        }
        start = end + 1;
    }
    None
}

/// 从头截取互不依赖的那一段
fn independent_prefix(plan: &ExecutionPlan, nodes: &[NodeId]) -> Vec<NodeId> {
    let mut run: Vec<NodeId> = Vec::new();
    let mut produced = HashSet::new();
    for &id in nodes.iter().take(MAX_RUN_LENGTH) {
        let Some(kind) = plan.kind(id) else {
            break;
        };
        if kind.variables_used().iter().any(|v| produced.contains(v)) {
            break;
        }
        produced.extend(kind.variables_set());
        run.push(id);
    }
    run
}

/// 字典序下一个排列；已是最后一个时返回 false
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(pivot) = (1..order.len()).rev().find(|&i| order[i - 1] < order[i]) else {
        return false;
    };
    let pivot = pivot - 1;
    let Some(swap) = (pivot + 1..order.len()).rev().find(|&i| order[i] > order[pivot]) else {
        return false;
    };
    order.swap(pivot, swap);
    order[pivot + 1..].reverse();
    true
}

/// 按 `order` 重新串接这段循环
fn reorder(plan: &ExecutionPlan, run: &[NodeId], order: &[usize]) -> RewriteResult<ExecutionPlan> {
    let mut result = plan.clone();
    let first = run[0];
    let last = run[run.len() - 1];
    let top = result.get(first)?.dependencies.clone();
    let below = result
        .dependent(last)
        .ok_or_else(|| RewriteError::rewrite_failed(format!("循环 {} 没有下游节点", last)))?;

    let mut previous: Option<NodeId> = None;
    for &position in order {
        let id = run[position];
        let dependencies = match previous {
            Some(prev) => vec![prev],
            None => top.clone(),
        };
        result.get_mut(id)?.dependencies = dependencies;
        previous = Some(id);
    }
    let new_last = previous.unwrap_or(last);
    for dep in result.get_mut(below)?.dependencies.iter_mut() {
        if *dep == last {
            *dep = new_last;
        }
    }
    result.validate()?;
    Ok(result)
}

fn interchange_adjacent_enumerations(
    _ctx: &mut RewriteContext,
    plan: &ExecutionPlan,
) -> RewriteResult<TransformResult> {
    // 只处理第一段，避免候选数量相乘
    let Some(run) = plan
        .chain_terminals()
        .into_iter()
        .find_map(|terminal| find_run(plan, terminal))
    else {
        return Ok(TransformResult::unchanged());
    };
    let mut alternatives = Vec::new();
    let mut order: Vec<usize> = (0..run.len()).collect();
    while next_permutation(&mut order) {
        alternatives.push(reorder(plan, &run, &order)?);
    }
    if alternatives.is_empty() {
        return Ok(TransformResult::unchanged());
    }
    log::debug!(
        "interchange-adjacent-enumerations produced {} alternative plans",
        alternatives.len()
    );
    Ok(TransformResult::alternatives(alternatives))
}
