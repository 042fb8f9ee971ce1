//! 模式匹配定义
//!
//! 规则的适用性预检：只看计划中出现了哪些节点类型，不做结构匹配。
//! 调度器每轮只计算一次节点类型集合，再逐条规则比对。

use std::collections::HashSet;

use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};

/// 单个匹配条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchNode {
    /// 必须出现该类型
    Single(PlanNodeType),
    /// 至少出现其中一种
    Multi(Vec<PlanNodeType>),
}

impl MatchNode {
    pub fn matches(&self, present: &HashSet<PlanNodeType>) -> bool {
        match self {
            MatchNode::Single(t) => present.contains(t),
            MatchNode::Multi(ts) => ts.iter().any(|t| present.contains(t)),
        }
    }
}

/// 模式：全部条件同时满足才匹配，空模式匹配任何计划
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub requirements: Vec<MatchNode>,
}

impl Pattern {
    /// 匹配任何计划
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(node: MatchNode) -> Self {
        Self {
            requirements: vec![node],
        }
    }

    pub fn new_with_type(node_type: PlanNodeType) -> Self {
        Self::with_node(MatchNode::Single(node_type))
    }

    pub fn multi(node_types: Vec<PlanNodeType>) -> Self {
        Self::with_node(MatchNode::Multi(node_types))
    }

    /// 追加一个必须出现的类型
    pub fn and_type(mut self, node_type: PlanNodeType) -> Self {
        self.requirements.push(MatchNode::Single(node_type));
        self
    }

    pub fn and_any(mut self, node_types: Vec<PlanNodeType>) -> Self {
        self.requirements.push(MatchNode::Multi(node_types));
        self
    }

    pub fn matches_types(&self, present: &HashSet<PlanNodeType>) -> bool {
        self.requirements.iter().all(|r| r.matches(present))
    }

    pub fn matches(&self, plan: &ExecutionPlan) -> bool {
        self.requirements.is_empty() || self.matches_types(&plan.node_types())
    }
}
