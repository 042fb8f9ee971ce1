//! 代价赋值器模块
//!
//! 为执行计划中的所有节点计算代价（仅用于优化决策，不存储到节点中）
//!
//! ## 使用示例
//!
//! ```rust
//! use std::collections::HashMap;
//! use aql_optimizer::core::types::expression::Expression;
//! use aql_optimizer::query::optimizer::cost::{CostAssigner, CostModelConfig};
//! use aql_optimizer::query::planner::plan::PlanBuilder;
//!
//! let mut builder = PlanBuilder::new();
//! let doc = builder.for_collection("users", "u");
//! builder.return_(Expression::reference(doc));
//! let plan = builder.build().unwrap();
//!
//! let counts = HashMap::from([("users".to_string(), 500u64)]);
//! let assigner = CostAssigner::new(CostModelConfig::default()).with_collection_counts(counts);
//! let cost = assigner.assign_costs(&plan).unwrap();
//! assert_eq!(cost.output_rows, 500.0);
//! ```
//!
//! ## 估算方式
//!
//! 自 Singleton 起按依赖顺序累加：每个节点在上游的估算上加上自身代价，
//! 循环节点把上游行数乘以每行产出的行数，子查询的代价为输入行数乘以子查询体代价。

use std::collections::HashMap;

use crate::core::error::{CostError, CostResult};
use crate::core::types::expression::Expression;
use crate::core::types::{NodeId, VariableId};
use crate::core::value::to_number;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind};

use super::{CostModelConfig, NodeCostEstimate, PlanCost, SelectivityEstimator};

/// 编译期无法确定长度的列表，假定的元素个数
const DEFAULT_LIST_LENGTH: f64 = 100.0;

/// 图遍历每层假定的扇出
const TRAVERSAL_FANOUT: f64 = 10.0;

/// 分组后剩余行数占输入的比例
const COLLECT_GROUP_RATIO: f64 = 0.8;

/// 代价赋值器
#[derive(Debug, Clone)]
pub struct CostAssigner {
    selectivity_estimator: SelectivityEstimator,
    config: CostModelConfig,
    collection_counts: HashMap<String, u64>,
    shards: usize,
}

impl CostAssigner {
    /// 创建新的代价赋值器
    pub fn new(config: CostModelConfig) -> Self {
        Self {
            selectivity_estimator: SelectivityEstimator::new(config),
            config,
            collection_counts: HashMap::new(),
            shards: 1,
        }
    }

    /// 设置各集合的文档数，缺失的集合按 `default_collection_count` 估算
    pub fn with_collection_counts(mut self, counts: HashMap<String, u64>) -> Self {
        self.collection_counts = counts;
        self
    }

    /// 设置分片数，影响 Gather 归并代价
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards.max(1);
        self
    }

    /// 获取选择性估计器
    pub fn selectivity_estimator(&self) -> &SelectivityEstimator {
        &self.selectivity_estimator
    }

    /// 获取配置
    pub fn config(&self) -> &CostModelConfig {
        &self.config
    }

    /// 为整个执行计划计算代价
    pub fn assign_costs(&self, plan: &ExecutionPlan) -> CostResult<PlanCost> {
        let mut cost = PlanCost::default();
        if let Some(root) = plan.root() {
            let estimate = self.estimate_chain(plan, root, &mut cost.nodes)?;
            cost.total_cost = estimate.total_cost;
            cost.output_rows = estimate.output_rows;
        }
        Ok(cost)
    }

    /// 估算一条链，返回终止节点的估算结果
    fn estimate_chain(
        &self,
        plan: &ExecutionPlan,
        terminal: NodeId,
        estimates: &mut HashMap<NodeId, NodeCostEstimate>,
    ) -> CostResult<NodeCostEstimate> {
        let mut last = NodeCostEstimate::default();
        for id in plan.chain(terminal) {
            let node = plan
                .node(id)
                .ok_or_else(|| CostError::MissingNode(id.to_string()))?;
            let input = match node.dependency() {
                Some(dep) => *estimates
                    .get(&dep)
                    .ok_or_else(|| CostError::MissingNode(dep.to_string()))?,
                None => NodeCostEstimate::default(),
            };
            last = self.estimate_node(plan, &node.kind, &input, estimates)?;
            estimates.insert(id, last);
        }
        Ok(last)
    }

    /// 根据节点类型估算自身代价与输出行数
    fn estimate_node(
        &self,
        plan: &ExecutionPlan,
        kind: &PlanNodeKind,
        input: &NodeCostEstimate,
        estimates: &mut HashMap<NodeId, NodeCostEstimate>,
    ) -> CostResult<NodeCostEstimate> {
        let c = &self.config;
        let rows = input.output_rows;

        let (node_cost, output_rows) = match kind {
            PlanNodeKind::Singleton => (c.cpu_tuple_cost, 1.0),

            PlanNodeKind::EnumerateCollection {
                collection, random, ..
            } => {
                let count = self.collection_count(collection);
                // 随机迭代略贵
                let factor = if *random { 1.005 } else { 1.0 };
                (rows * count * c.cpu_tuple_cost * factor + 1.0, rows * count)
            }

            PlanNodeKind::Index {
                collection,
                index,
                condition,
                ..
            } => {
                let count = self.collection_count(collection);
                let matches = self
                    .selectivity_estimator
                    .estimate_index_matches(index, condition, count);
                let lookup = (count + 1.0).log2() * c.cpu_index_tuple_cost;
                (rows * (lookup + matches * c.cpu_tuple_cost), rows * matches)
            }

            PlanNodeKind::EnumerateList { input: list, .. } => {
                let length = self.list_length(plan, *list, estimates);
                (rows * length * c.cpu_tuple_cost, rows * length)
            }

            PlanNodeKind::Calculation { .. } => (rows * c.cpu_operator_cost, rows),

            PlanNodeKind::Filter { input: condition } => {
                let selectivity = plan
                    .variable_setter(*condition)
                    .and_then(|setter| plan.kind(setter))
                    .and_then(|kind| kind.expression())
                    .map(|e| self.selectivity_estimator.estimate_from_expression(e))
                    .unwrap_or(c.default_filter_selectivity);
                (rows * c.cpu_operator_cost, rows * selectivity)
            }

            PlanNodeKind::Sort { .. } => {
                let comparisons = rows * rows.max(2.0).log2();
                (comparisons * c.sort_comparison_cost, rows)
            }

            PlanNodeKind::Limit {
                offset,
                count,
                full_count,
            } => {
                let remaining = (rows - *offset as f64).max(0.0);
                let produced = remaining.min(*count as f64);
                let processed = if *full_count { rows } else { produced };
                (processed * c.cpu_tuple_cost, produced)
            }

            PlanNodeKind::Collect { groups, .. } => {
                let output = if groups.is_empty() {
                    1.0
                } else {
                    (rows * COLLECT_GROUP_RATIO).max(1.0)
                };
                let sort = rows * rows.max(2.0).log2() * c.sort_comparison_cost;
                (sort + rows * c.cpu_tuple_cost, output.min(rows.max(1.0)))
            }

            PlanNodeKind::Subquery { root, .. } => {
                let body = self.estimate_chain(plan, *root, estimates)?;
                (rows * body.total_cost, rows)
            }

            PlanNodeKind::Return { .. } => (rows * c.cpu_tuple_cost, rows),

            PlanNodeKind::NoResults => (0.5, 0.0),

            PlanNodeKind::Scatter | PlanNodeKind::Distribute { .. } => {
                (rows * c.cpu_tuple_cost, rows)
            }

            PlanNodeKind::Remote { .. } => (rows * c.remote_row_cost, rows),

            PlanNodeKind::Gather { elements } => {
                let merge = if elements.is_empty() {
                    1.0
                } else {
                    (self.shards as f64).log2().max(1.0)
                };
                (rows * merge * c.cpu_tuple_cost, rows)
            }

            PlanNodeKind::Traversal {
                edge_collection,
                min_depth,
                max_depth,
                ..
            } => {
                let per_start: f64 = (*min_depth..=*max_depth)
                    .map(|depth| TRAVERSAL_FANOUT.powi(depth.min(16) as i32))
                    .sum();
                let lookup = (self.collection_count(edge_collection) + 1.0).log2();
                let produced = rows * per_start;
                (produced * (lookup + c.cpu_tuple_cost), produced)
            }

            PlanNodeKind::ShortestPath {
                edge_collection, ..
            } => {
                let edges = self.collection_count(edge_collection);
                (rows * edges * c.cpu_tuple_cost, rows * TRAVERSAL_FANOUT)
            }

            PlanNodeKind::Insert { .. }
            | PlanNodeKind::Update { .. }
            | PlanNodeKind::Replace { .. }
            | PlanNodeKind::Remove { .. }
            | PlanNodeKind::Upsert { .. } => (rows * 2.0 * c.cpu_tuple_cost, rows),
        };

        Ok(NodeCostEstimate::on_top_of(input, node_cost, output_rows))
    }

    fn collection_count(&self, collection: &str) -> f64 {
        self.collection_counts
            .get(collection)
            .copied()
            .unwrap_or(self.config.default_collection_count) as f64
    }

    /// 常量数组与常量范围可以得到准确长度，子查询结果取子查询体的行数估算
    fn list_length(
        &self,
        plan: &ExecutionPlan,
        list: VariableId,
        estimates: &HashMap<NodeId, NodeCostEstimate>,
    ) -> f64 {
        let Some(setter) = plan.variable_setter(list) else {
            return DEFAULT_LIST_LENGTH;
        };
        match plan.kind(setter) {
            Some(PlanNodeKind::Calculation { expression, .. }) => match expression {
                Expression::Array { items } => items.len() as f64,
                Expression::Literal { value } => value
                    .as_array()
                    .map(|a| a.len() as f64)
                    .unwrap_or(DEFAULT_LIST_LENGTH),
                Expression::Range { low, high } => match (low.as_literal(), high.as_literal()) {
                    (Some(low), Some(high)) => {
                        ((to_number(high) - to_number(low)).abs() + 1.0).floor()
                    }
                    _ => DEFAULT_LIST_LENGTH,
                },
                _ => DEFAULT_LIST_LENGTH,
            },
            Some(PlanNodeKind::Subquery { root, .. }) => estimates
                .get(root)
                .map(|e| e.output_rows)
                .unwrap_or(DEFAULT_LIST_LENGTH),
            _ => DEFAULT_LIST_LENGTH,
        }
    }
}

impl Default for CostAssigner {
    fn default() -> Self {
        Self::new(CostModelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexClause, IndexCondition, IndexDescriptor, IndexType};
    use crate::core::types::operators::ComparisonOperator;
    use crate::query::planner::plan::PlanBuilder;

    fn counts(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_full_scan_cost_follows_collection_size() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let small = CostAssigner::default()
            .with_collection_counts(counts(&[("c", 10)]))
            .assign_costs(&plan)
            .unwrap();
        let large = CostAssigner::default()
            .with_collection_counts(counts(&[("c", 10_000)]))
            .assign_costs(&plan)
            .unwrap();
        assert_eq!(small.output_rows, 10.0);
        assert!(large.total_cost > small.total_cost);
        assert_eq!(small.nodes.len(), plan.node_count());
    }

    #[test]
    fn test_nested_loops_multiply() {
        let mut builder = PlanBuilder::new();
        builder.for_list(
            Expression::range(Expression::literal(1), Expression::literal(10)),
            "i",
        );
        let doc = builder.for_collection("c", "doc");
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let cost = CostAssigner::default()
            .with_collection_counts(counts(&[("c", 100)]))
            .assign_costs(&plan)
            .unwrap();
        assert_eq!(cost.output_rows, 1000.0);
    }

    #[test]
    fn test_index_cheaper_than_full_scan() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.return_(Expression::reference(doc));
        let scan_plan = builder.build().unwrap();

        let mut index_plan = scan_plan.clone();
        let scan = index_plan.walk(crate::query::planner::plan::WalkOrder::Dependency)
            .find(|n| matches!(n.kind, PlanNodeKind::EnumerateCollection { .. }))
            .map(|n| n.id)
            .unwrap();
        let mut index = IndexDescriptor::new("c/2", "c", IndexType::Persistent, vec!["value".into()]);
        index.selectivity_estimate = 0.5;
        if let Some(node) = index_plan.node_mut(scan) {
            node.kind = PlanNodeKind::Index {
                collection: "c".to_string(),
                out: doc,
                index,
                condition: IndexCondition::new(vec![IndexClause::new(
                    vec!["value".to_string()],
                    ComparisonOperator::Eq,
                    Expression::literal(3),
                )]),
                reverse: false,
                ordered: Vec::new(),
            };
        }

        let assigner = CostAssigner::default().with_collection_counts(counts(&[("c", 1000)]));
        let scan_cost = assigner.assign_costs(&scan_plan).unwrap();
        let index_cost = assigner.assign_costs(&index_plan).unwrap();
        assert!(index_cost.total_cost < scan_cost.total_cost);
        assert_eq!(index_cost.output_rows, 2.0);
    }

    #[test]
    fn test_subquery_cost_scales_with_input() {
        let mut builder = PlanBuilder::new();
        builder.for_list(
            Expression::array(vec![Expression::literal(1), Expression::literal(2)]),
            "i",
        );
        let sub = builder.subquery("sub", |b| {
            let doc = b.for_collection("c", "doc");
            b.return_(Expression::reference(doc));
        });
        builder.return_(Expression::reference(sub));
        let plan = builder.build().unwrap();

        let cost = CostAssigner::default()
            .with_collection_counts(counts(&[("c", 50)]))
            .assign_costs(&plan)
            .unwrap();
        assert_eq!(cost.output_rows, 2.0);
        assert!(cost.total_cost > 100.0);
    }
}
