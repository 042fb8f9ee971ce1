//! 计划选择器
//!
//! 在候选计划中选出代价最低的一个：代价相差在相对误差以内视为相同，
//! 再比较节点数，最后按候选产生的先后顺序。

use std::cmp::Ordering;

/// 代价比较的相对误差
const RELATIVE_EPSILON: f64 = 1e-9;

/// 参与选择的候选摘要
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSummary {
    pub estimated_cost: f64,
    pub node_count: usize,
}

/// 计划选择器
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanSelector;

impl PlanSelector {
    pub fn new() -> Self {
        Self
    }

    /// 两个代价在相对误差以内视为相同
    pub fn costs_equal(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= RELATIVE_EPSILON * scale
    }

    pub fn compare(a: &CandidateSummary, b: &CandidateSummary) -> Ordering {
        if !Self::costs_equal(a.estimated_cost, b.estimated_cost) {
            return a.estimated_cost.total_cmp(&b.estimated_cost);
        }
        a.node_count.cmp(&b.node_count)
    }

    /// 最优候选的下标；候选为空时返回 None
    pub fn select(&self, candidates: &[CandidateSummary]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            best = match best {
                Some(current)
                    if Self::compare(candidate, &candidates[current]) != Ordering::Less =>
                {
                    Some(current)
                }
                _ => Some(i),
            };
        }
        best
    }

    /// 按选择顺序排列的下标，第一个即最优候选
    ///
    /// 带误差的代价比较不满足传递性，不能交给 `sort_by`；每次在剩余候选上重复 `select`。
    pub fn rank(&self, candidates: &[CandidateSummary]) -> Vec<usize> {
        let mut remaining: Vec<usize> = (0..candidates.len()).collect();
        let mut order = Vec::with_capacity(candidates.len());
        while !remaining.is_empty() {
            let summaries: Vec<CandidateSummary> = remaining.iter().map(|&i| candidates[i]).collect();
            let Some(position) = self.select(&summaries) else {
                break;
            };
            order.push(remaining.remove(position));
        }
        order
    }
}
