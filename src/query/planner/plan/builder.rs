//! 初始计划构建器
//!
//! 按 AQL 编译器的方式生成未优化的计划：每个非变量引用的表达式都会落到一个
//! 临时变量的 CalculationNode 上，FILTER/SORT/RETURN 只引用变量。
//!
//! ```rust
//! use aql_optimizer::core::types::expression::Expression;
//! use aql_optimizer::query::planner::plan::PlanBuilder;
//!
//! let mut builder = PlanBuilder::new();
//! let doc = builder.for_collection("users", "doc");
//! builder.filter(Expression::gt(
//!     Expression::attribute_path(doc, "age"),
//!     Expression::literal(30),
//! ));
//! builder.return_(Expression::reference(doc));
//! let plan = builder.build().unwrap();
//! assert_eq!(plan.node_count(), 5);
//! ```

use std::ops::RangeInclusive;

use crate::core::error::{PlanError, PlanResult};
use crate::core::types::expression::Expression;
use crate::core::types::{NodeId, VariableId};
use crate::query::planner::plan::execution_plan::ExecutionPlan;
use crate::query::planner::plan::node::{
    AggregateFunction, CollectAggregate, CollectGroup, CollectInto, ModificationOptions,
    PlanNodeKind, SortElement,
};
use crate::storage::Direction;

/// COLLECT 产生的变量
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectVariables {
    pub groups: Vec<VariableId>,
    pub aggregates: Vec<VariableId>,
    pub into: Option<VariableId>,
}

/// 修改节点产生的 OLD / NEW 变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModificationVariables {
    pub old: Option<VariableId>,
    pub new: Option<VariableId>,
}

/// 图遍历产生的变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalVariables {
    pub vertex: VariableId,
    pub edge: Option<VariableId>,
    pub path: Option<VariableId>,
}

/// 计划构建器，记录第一个错误并在 `build` 时返回
#[derive(Debug)]
pub struct PlanBuilder {
    plan: ExecutionPlan,
    current: Option<NodeId>,
    error: Option<PlanError>,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            plan: ExecutionPlan::new(),
            current: None,
            error: None,
        };
        builder.current = builder.add(PlanNodeKind::Singleton);
        builder
    }

    /// 当前链的末端节点
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    fn add(&mut self, kind: PlanNodeKind) -> Option<NodeId> {
        if self.error.is_some() {
            return None;
        }
        match self.plan.create_node(kind, self.current) {
            Ok(id) => {
                self.current = Some(id);
                Some(id)
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }

    fn variable(&mut self, name: &str) -> VariableId {
        self.plan.variables_mut().create(name)
    }

    /// 表达式对应的变量：引用直接返回，否则生成临时计算节点
    fn variable_for(&mut self, expression: Expression) -> VariableId {
        if let Some(variable) = expression.as_reference() {
            return variable;
        }
        self.calculate(expression)
    }

    /// 临时变量的计算节点
    pub fn calculate(&mut self, expression: Expression) -> VariableId {
        let out = self.plan.variables_mut().create_temporary();
        self.add(PlanNodeKind::Calculation { out, expression });
        out
    }

    /// `FOR name IN collection`
    pub fn for_collection(&mut self, collection: &str, name: &str) -> VariableId {
        let out = self.variable(name);
        self.add(PlanNodeKind::EnumerateCollection {
            collection: collection.to_string(),
            out,
            random: false,
        });
        out
    }

    /// `FOR name IN list`
    pub fn for_list(&mut self, list: Expression, name: &str) -> VariableId {
        let input = self.variable_for(list);
        let out = self.variable(name);
        self.add(PlanNodeKind::EnumerateList { input, out });
        out
    }

    /// `LET name = expression`
    pub fn let_(&mut self, name: &str, expression: Expression) -> VariableId {
        let out = self.variable(name);
        self.add(PlanNodeKind::Calculation { out, expression });
        out
    }

    pub fn filter(&mut self, condition: Expression) -> &mut Self {
        let input = self.variable_for(condition);
        self.add(PlanNodeKind::Filter { input });
        self
    }

    /// `SORT e1 [ASC|DESC], ...`
    pub fn sort(&mut self, criteria: Vec<(Expression, bool)>) -> &mut Self {
        let elements: Vec<SortElement> = criteria
            .into_iter()
            .map(|(expression, ascending)| SortElement::new(self.variable_for(expression), ascending))
            .collect();
        self.add(PlanNodeKind::Sort {
            elements,
            stable: false,
        });
        self
    }

    pub fn limit(&mut self, offset: u64, count: u64) -> &mut Self {
        self.add(PlanNodeKind::Limit {
            offset,
            count,
            full_count: false,
        });
        self
    }

    /// LIMIT 并统计忽略 LIMIT 时的行数
    pub fn limit_full_count(&mut self, offset: u64, count: u64) -> &mut Self {
        self.add(PlanNodeKind::Limit {
            offset,
            count,
            full_count: true,
        });
        self
    }

    /// `COLLECT g = e, ... AGGREGATE a = FN(e), ... [INTO name [= projection]]`
    pub fn collect(
        &mut self,
        groups: Vec<(&str, Expression)>,
        aggregates: Vec<(&str, AggregateFunction, Option<Expression>)>,
        into: Option<(&str, Option<Expression>)>,
    ) -> CollectVariables {
        let group_inputs: Vec<(&str, VariableId)> = groups
            .into_iter()
            .map(|(name, expression)| (name, self.variable_for(expression)))
            .collect();
        let aggregate_inputs: Vec<(&str, AggregateFunction, Option<VariableId>)> = aggregates
            .into_iter()
            .map(|(name, function, expression)| {
                (name, function, expression.map(|e| self.variable_for(e)))
            })
            .collect();
        let projection = into
            .as_ref()
            .and_then(|(_, p)| p.clone())
            .map(|p| self.variable_for(p));

        let mut result = CollectVariables::default();
        let groups: Vec<CollectGroup> = group_inputs
            .into_iter()
            .map(|(name, input)| {
                let out = self.variable(name);
                result.groups.push(out);
                CollectGroup { out, input }
            })
            .collect();
        let aggregates: Vec<CollectAggregate> = aggregate_inputs
            .into_iter()
            .map(|(name, function, input)| {
                let out = self.variable(name);
                result.aggregates.push(out);
                CollectAggregate {
                    out,
                    function,
                    input,
                }
            })
            .collect();
        let into = into.map(|(name, _)| {
            let out = self.variable(name);
            result.into = Some(out);
            CollectInto { out, projection }
        });
        self.add(PlanNodeKind::Collect {
            groups,
            aggregates,
            into,
        });
        result
    }

    /// `LET name = (subquery)`，子查询体由闭包在新的 Singleton 上构建
    pub fn subquery<F>(&mut self, name: &str, body: F) -> VariableId
    where
        F: FnOnce(&mut PlanBuilder),
    {
        let outer = self.current;
        self.current = None;
        self.add(PlanNodeKind::Singleton);
        body(self);
        let inner_root = self.current;
        self.current = outer;

        let out = self.variable(name);
        match inner_root {
            Some(root) => {
                self.add(PlanNodeKind::Subquery { root, out });
            }
            None => {
                if self.error.is_none() {
                    self.error = Some(PlanError::invalid_plan_structure("子查询体为空"));
                }
            }
        }
        out
    }

    /// `FOR v, e, p IN min..max direction start edge_collection`
    #[allow(clippy::too_many_arguments)]
    pub fn traversal(
        &mut self,
        start: Expression,
        edge_collection: &str,
        direction: Direction,
        depth: RangeInclusive<u64>,
        vertex: &str,
        edge: Option<&str>,
        path: Option<&str>,
    ) -> TraversalVariables {
        let start = self.variable_for(start);
        let vertex_out = self.variable(vertex);
        let edge_out = edge.map(|name| self.variable(name));
        let path_out = path.map(|name| self.variable(name));
        self.add(PlanNodeKind::Traversal {
            start,
            edge_collection: edge_collection.to_string(),
            direction,
            min_depth: *depth.start(),
            max_depth: *depth.end(),
            vertex_out,
            edge_out,
            path_out,
        });
        TraversalVariables {
            vertex: vertex_out,
            edge: edge_out,
            path: path_out,
        }
    }

    /// `FOR v, e IN direction SHORTEST_PATH start TO target edge_collection`
    pub fn shortest_path(
        &mut self,
        start: Expression,
        target: Expression,
        edge_collection: &str,
        direction: Direction,
        vertex: &str,
        edge: Option<&str>,
    ) -> (VariableId, Option<VariableId>) {
        let start = self.variable_for(start);
        let target = self.variable_for(target);
        let vertex_out = self.variable(vertex);
        let edge_out = edge.map(|name| self.variable(name));
        self.add(PlanNodeKind::ShortestPath {
            start,
            target,
            edge_collection: edge_collection.to_string(),
            direction,
            vertex_out,
            edge_out,
        });
        (vertex_out, edge_out)
    }

    /// `INSERT document INTO collection`，返回 NEW
    pub fn insert(
        &mut self,
        collection: &str,
        document: Expression,
        options: ModificationOptions,
    ) -> VariableId {
        let input = self.variable_for(document);
        let out_new = self.variable("NEW");
        self.add(PlanNodeKind::Insert {
            collection: collection.to_string(),
            input,
            out_new: Some(out_new),
            options,
        });
        out_new
    }

    /// `UPDATE [key WITH] patch IN collection`
    pub fn update(
        &mut self,
        collection: &str,
        key: Option<Expression>,
        patch: Expression,
        options: ModificationOptions,
    ) -> ModificationVariables {
        let key = key.map(|k| self.variable_for(k));
        let input = self.variable_for(patch);
        let (out_old, out_new) = (self.variable("OLD"), self.variable("NEW"));
        self.add(PlanNodeKind::Update {
            collection: collection.to_string(),
            key,
            input,
            out_old: Some(out_old),
            out_new: Some(out_new),
            options,
        });
        ModificationVariables {
            old: Some(out_old),
            new: Some(out_new),
        }
    }

    /// `REPLACE [key WITH] document IN collection`
    pub fn replace(
        &mut self,
        collection: &str,
        key: Option<Expression>,
        document: Expression,
        options: ModificationOptions,
    ) -> ModificationVariables {
        let key = key.map(|k| self.variable_for(k));
        let input = self.variable_for(document);
        let (out_old, out_new) = (self.variable("OLD"), self.variable("NEW"));
        self.add(PlanNodeKind::Replace {
            collection: collection.to_string(),
            key,
            input,
            out_old: Some(out_old),
            out_new: Some(out_new),
            options,
        });
        ModificationVariables {
            old: Some(out_old),
            new: Some(out_new),
        }
    }

    /// `REMOVE key IN collection`，返回 OLD
    pub fn remove(
        &mut self,
        collection: &str,
        key: Expression,
        options: ModificationOptions,
    ) -> VariableId {
        let input = self.variable_for(key);
        let out_old = self.variable("OLD");
        self.add(PlanNodeKind::Remove {
            collection: collection.to_string(),
            input,
            out_old: Some(out_old),
            options,
        });
        out_old
    }

    /// `UPSERT search INSERT insert UPDATE|REPLACE update IN collection`，返回 NEW
    pub fn upsert(
        &mut self,
        collection: &str,
        search: Expression,
        insert: Expression,
        update: Expression,
        replace: bool,
        options: ModificationOptions,
    ) -> VariableId {
        let search = self.variable_for(search);
        let insert = self.variable_for(insert);
        let update = self.variable_for(update);
        let out_new = self.variable("NEW");
        self.add(PlanNodeKind::Upsert {
            collection: collection.to_string(),
            search,
            insert,
            update,
            replace,
            out_new: Some(out_new),
            options,
        });
        out_new
    }

    pub fn return_(&mut self, expression: Expression) -> &mut Self {
        let input = self.variable_for(expression);
        self.add(PlanNodeKind::Return { input });
        self
    }

    /// 以当前末端为根完成构建，并校验计划结构
    pub fn build(mut self) -> PlanResult<ExecutionPlan> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let root = self
            .current
            .ok_or_else(|| PlanError::invalid_plan_structure("计划为空"))?;
        self.plan.set_root(root)?;
        self.plan.validate()?;
        Ok(self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::planner::plan::node::PlanNodeType;
    use crate::query::planner::plan::walker::WalkOrder;

    fn types(plan: &ExecutionPlan) -> Vec<PlanNodeType> {
        plan.walk(WalkOrder::Dependency).map(|n| n.node_type()).collect()
    }

    #[test]
    fn test_filter_creates_temporary_calculation() {
        let mut builder = PlanBuilder::new();
        let i = builder.for_list(
            Expression::range(Expression::literal(1), Expression::literal(10)),
            "i",
        );
        let a = builder.let_("a", Expression::add(Expression::reference(i), Expression::literal(1)));
        builder.filter(Expression::lt(Expression::reference(i), Expression::literal(4)));
        builder.return_(Expression::reference(a));
        let plan = builder.build().unwrap();
        assert_eq!(
            types(&plan),
            vec![
                PlanNodeType::Singleton,
                PlanNodeType::Calculation,
                PlanNodeType::EnumerateList,
                PlanNodeType::Calculation,
                PlanNodeType::Calculation,
                PlanNodeType::Filter,
                PlanNodeType::Return,
            ]
        );
    }

    #[test]
    fn test_subquery_body_is_separate_chain() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("users", "doc");
        let sub = builder.subquery("sub", |b| {
            let x = b.for_list(Expression::array(vec![Expression::literal(1)]), "x");
            b.return_(Expression::add(Expression::reference(x), Expression::attribute_path(doc, "v")));
        });
        builder.return_(Expression::reference(sub));
        let plan = builder.build().unwrap();
        assert_eq!(
            types(&plan),
            vec![
                PlanNodeType::Singleton,
                PlanNodeType::EnumerateCollection,
                PlanNodeType::Subquery,
                PlanNodeType::Return,
            ]
        );
        let subquery = plan.find_nodes(PlanNodeType::Subquery)[0];
        assert!(plan.variables_used(subquery).contains(&doc));
    }

    #[test]
    fn test_collect_and_sort() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("users", "doc");
        let vars = builder.collect(
            vec![("city", Expression::attribute_path(doc, "city"))],
            vec![("n", AggregateFunction::Count, None)],
            None,
        );
        builder.sort(vec![(Expression::reference(vars.aggregates[0]), false)]);
        builder.return_(Expression::reference(vars.groups[0]));
        let plan = builder.build().unwrap();
        assert_eq!(plan.find_nodes(PlanNodeType::Collect).len(), 1);
        assert_eq!(plan.find_nodes(PlanNodeType::Calculation).len(), 1);
    }
}
