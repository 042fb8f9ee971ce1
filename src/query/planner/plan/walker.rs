//! 计划遍历器
//!
//! 显式栈的深度优先遍历，惰性、有限，并且可以通过 `Clone` 重新开始。

use std::collections::HashSet;

use crate::core::types::NodeId;
use crate::query::planner::plan::execution_plan::ExecutionPlan;
use crate::query::planner::plan::node::{PlanNode, PlanNodeKind};

/// 遍历顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOrder {
    /// 依赖顺序：Singleton 在前，终止节点在后
    Dependency,
    /// 从终止节点往 Singleton 方向
    Reverse,
}

#[derive(Debug, Clone)]
pub struct PlanWalker<'a> {
    plan: &'a ExecutionPlan,
    order: WalkOrder,
    include_subqueries: bool,
    /// (节点, 依赖是否已展开)
    stack: Vec<(NodeId, bool)>,
    visited: HashSet<NodeId>,
}

impl<'a> PlanWalker<'a> {
    pub(crate) fn new(
        plan: &'a ExecutionPlan,
        start: Option<NodeId>,
        order: WalkOrder,
        include_subqueries: bool,
    ) -> Self {
        Self {
            plan,
            order,
            include_subqueries,
            stack: start.map(|id| (id, false)).into_iter().collect(),
            visited: HashSet::new(),
        }
    }

    fn subquery_root(&self, node: &PlanNode) -> Option<NodeId> {
        match &node.kind {
            PlanNodeKind::Subquery { root, .. } if self.include_subqueries => Some(*root),
            _ => None,
        }
    }

    fn next_dependency_order(&mut self) -> Option<&'a PlanNode> {
        while let Some((id, expanded)) = self.stack.pop() {
            let Some(node) = self.plan.node(id) else {
                continue;
            };
            if expanded {
                return Some(node);
            }
            if !self.visited.insert(id) {
                continue;
            }
            // 出栈顺序：依赖链、子查询体、节点本身
            self.stack.push((id, true));
            if let Some(root) = self.subquery_root(node) {
                self.stack.push((root, false));
            }
            for dep in node.dependencies.iter().rev() {
                self.stack.push((*dep, false));
            }
        }
        None
    }

    fn next_reverse_order(&mut self) -> Option<&'a PlanNode> {
        while let Some((id, _)) = self.stack.pop() {
            let Some(node) = self.plan.node(id) else {
                continue;
            };
            if !self.visited.insert(id) {
                continue;
            }
            for dep in node.dependencies.iter().rev() {
                self.stack.push((*dep, false));
            }
            if let Some(root) = self.subquery_root(node) {
                self.stack.push((root, false));
            }
            return Some(node);
        }
        None
    }
}

impl<'a> Iterator for PlanWalker<'a> {
    type Item = &'a PlanNode;

    fn next(&mut self) -> Option<Self::Item> {
        match self.order {
            WalkOrder::Dependency => self.next_dependency_order(),
            WalkOrder::Reverse => self.next_reverse_order(),
        }
    }
}
