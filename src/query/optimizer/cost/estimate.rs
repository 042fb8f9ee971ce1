//! 节点代价估算结果
//!
//! 定义节点代价估算的数据结构，包含：
//! - 节点自身代价（不包含上游节点）
//! - 累计代价（包含所有上游节点）
//! - 估算的输出行数

use std::collections::HashMap;

use crate::core::types::NodeId;

/// 节点代价和行数估算结果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NodeCostEstimate {
    /// 节点自身代价（不包含上游节点）
    pub node_cost: f64,
    /// 累计代价（包含所有上游节点）
    pub total_cost: f64,
    /// 估算的输出行数
    pub output_rows: f64,
}

impl NodeCostEstimate {
    /// 创建新的估算结果
    pub fn new(node_cost: f64, total_cost: f64, output_rows: f64) -> Self {
        Self {
            node_cost,
            total_cost,
            output_rows,
        }
    }

    /// 创建叶子节点的估算结果（无上游）
    pub fn leaf(node_cost: f64, output_rows: f64) -> Self {
        Self {
            node_cost,
            total_cost: node_cost,
            output_rows,
        }
    }

    /// 在上游估算的基础上叠加本节点
    pub fn on_top_of(input: &Self, node_cost: f64, output_rows: f64) -> Self {
        Self {
            node_cost,
            total_cost: input.total_cost + node_cost,
            output_rows,
        }
    }

    /// 检查估算结果是否有效
    pub fn is_valid(&self) -> bool {
        self.node_cost >= 0.0 && self.total_cost >= 0.0 && self.output_rows >= 0.0
    }
}

/// 整个计划的代价：每个节点的估算加上终止节点的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanCost {
    pub nodes: HashMap<NodeId, NodeCostEstimate>,
    pub total_cost: f64,
    pub output_rows: f64,
}

impl PlanCost {
    pub fn node(&self, id: NodeId) -> Option<&NodeCostEstimate> {
        self.nodes.get(&id)
    }
}
