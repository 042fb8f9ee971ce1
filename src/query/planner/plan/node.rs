//! 计划节点定义
//!
//! `PlanNodeKind` 是封闭的节点类型枚举，所有按节点类型的分派都用穷尽匹配；
//! 新增节点类型时编译器会指出每一个需要更新的位置。
//!
//! 依赖关系从下游指向上游：`Return` 依赖 `Filter`，`Filter` 依赖 `EnumerateCollection`……
//! 一直到 `Singleton`。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::types::expression::Expression;
use crate::core::types::{NodeId, VariableId};
use crate::index::{IndexCondition, IndexDescriptor};
use crate::storage::Direction;

/// 排序条件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortElement {
    pub variable: VariableId,
    pub ascending: bool,
}

impl SortElement {
    pub fn new(variable: VariableId, ascending: bool) -> Self {
        Self {
            variable,
            ascending,
        }
    }
}

/// 按属性路径排序的条件，用于 Gather 归并与有序索引扫描
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortPath {
    pub variable: VariableId,
    pub path: Vec<String>,
    pub ascending: bool,
}

impl SortPath {
    pub fn new(variable: VariableId, path: Vec<String>, ascending: bool) -> Self {
        Self {
            variable,
            path,
            ascending,
        }
    }
}

/// COLLECT 的分组变量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectGroup {
    pub out: VariableId,
    pub input: VariableId,
}

/// 聚合函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Average,
    Unique,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::Average => "AVERAGE",
            AggregateFunction::Unique => "UNIQUE",
        }
    }
}

/// COLLECT 的聚合项；`COUNT` 不需要输入变量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectAggregate {
    pub out: VariableId,
    pub function: AggregateFunction,
    pub input: Option<VariableId>,
}

/// `COLLECT ... INTO out [= projection]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectInto {
    pub out: VariableId,
    pub projection: Option<VariableId>,
}

/// 修改类节点的选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationOptions {
    /// 单个文档失败时忽略该文档并继续
    pub ignore_errors: bool,
}

/// 节点类型标签，用于模式匹配与按类型查找
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanNodeType {
    Singleton,
    EnumerateCollection,
    Index,
    EnumerateList,
    Calculation,
    Filter,
    Sort,
    Limit,
    Collect,
    Subquery,
    Return,
    NoResults,
    Scatter,
    Gather,
    Distribute,
    Remote,
    Traversal,
    ShortestPath,
    Insert,
    Update,
    Replace,
    Remove,
    Upsert,
}

impl PlanNodeType {
    /// explain 输出中的类型名
    pub fn name(&self) -> &'static str {
        match self {
            PlanNodeType::Singleton => "SingletonNode",
            PlanNodeType::EnumerateCollection => "EnumerateCollectionNode",
            PlanNodeType::Index => "IndexNode",
            PlanNodeType::EnumerateList => "EnumerateListNode",
            PlanNodeType::Calculation => "CalculationNode",
            PlanNodeType::Filter => "FilterNode",
            PlanNodeType::Sort => "SortNode",
            PlanNodeType::Limit => "LimitNode",
            PlanNodeType::Collect => "CollectNode",
            PlanNodeType::Subquery => "SubqueryNode",
            PlanNodeType::Return => "ReturnNode",
            PlanNodeType::NoResults => "NoResultsNode",
            PlanNodeType::Scatter => "ScatterNode",
            PlanNodeType::Gather => "GatherNode",
            PlanNodeType::Distribute => "DistributeNode",
            PlanNodeType::Remote => "RemoteNode",
            PlanNodeType::Traversal => "TraversalNode",
            PlanNodeType::ShortestPath => "ShortestPathNode",
            PlanNodeType::Insert => "InsertNode",
            PlanNodeType::Update => "UpdateNode",
            PlanNodeType::Replace => "ReplaceNode",
            PlanNodeType::Remove => "RemoveNode",
            PlanNodeType::Upsert => "UpsertNode",
        }
    }

    /// 每行输入产生多行输出的循环节点
    pub fn is_enumeration(&self) -> bool {
        matches!(
            self,
            PlanNodeType::EnumerateCollection
                | PlanNodeType::Index
                | PlanNodeType::EnumerateList
                | PlanNodeType::Traversal
                | PlanNodeType::ShortestPath
        )
    }

    pub fn is_modification(&self) -> bool {
        matches!(
            self,
            PlanNodeType::Insert
                | PlanNodeType::Update
                | PlanNodeType::Replace
                | PlanNodeType::Remove
                | PlanNodeType::Upsert
        )
    }

    /// 集群分发相关节点
    pub fn is_cluster(&self) -> bool {
        matches!(
            self,
            PlanNodeType::Scatter
                | PlanNodeType::Gather
                | PlanNodeType::Distribute
                | PlanNodeType::Remote
        )
    }
}

impl fmt::Display for PlanNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 节点类型与负载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanNodeKind {
    Singleton,
    EnumerateCollection {
        collection: String,
        out: VariableId,
        /// 以随机顺序迭代
        random: bool,
    },
    Index {
        collection: String,
        out: VariableId,
        index: IndexDescriptor,
        condition: IndexCondition,
        reverse: bool,
        /// 下游依赖的输出顺序，空表示顺序无关
        ordered: Vec<SortPath>,
    },
    EnumerateList {
        input: VariableId,
        out: VariableId,
    },
    Calculation {
        out: VariableId,
        expression: Expression,
    },
    Filter {
        input: VariableId,
    },
    Sort {
        elements: Vec<SortElement>,
        stable: bool,
    },
    Limit {
        offset: u64,
        count: u64,
        full_count: bool,
    },
    Collect {
        groups: Vec<CollectGroup>,
        aggregates: Vec<CollectAggregate>,
        into: Option<CollectInto>,
    },
    Subquery {
        /// 子查询终止节点
        root: NodeId,
        out: VariableId,
    },
    Return {
        input: VariableId,
    },
    NoResults,
    Scatter,
    Gather {
        elements: Vec<SortPath>,
    },
    Distribute {
        collection: String,
        input: VariableId,
    },
    Remote {
        collection: String,
        server: String,
    },
    Traversal {
        start: VariableId,
        edge_collection: String,
        direction: Direction,
        min_depth: u64,
        max_depth: u64,
        vertex_out: VariableId,
        edge_out: Option<VariableId>,
        path_out: Option<VariableId>,
    },
    ShortestPath {
        start: VariableId,
        target: VariableId,
        edge_collection: String,
        direction: Direction,
        vertex_out: VariableId,
        edge_out: Option<VariableId>,
    },
    Insert {
        collection: String,
        input: VariableId,
        out_new: Option<VariableId>,
        options: ModificationOptions,
    },
    Update {
        collection: String,
        /// 文档键；为空时取 `input._key`
        key: Option<VariableId>,
        input: VariableId,
        out_old: Option<VariableId>,
        out_new: Option<VariableId>,
        options: ModificationOptions,
    },
    Replace {
        collection: String,
        key: Option<VariableId>,
        input: VariableId,
        out_old: Option<VariableId>,
        out_new: Option<VariableId>,
        options: ModificationOptions,
    },
    Remove {
        collection: String,
        /// 文档键或带 `_key` 的文档
        input: VariableId,
        out_old: Option<VariableId>,
        options: ModificationOptions,
    },
    Upsert {
        collection: String,
        search: VariableId,
        insert: VariableId,
        update: VariableId,
        /// true 时用 REPLACE 语义
        replace: bool,
        out_new: Option<VariableId>,
        options: ModificationOptions,
    },
}

impl PlanNodeKind {
    pub fn node_type(&self) -> PlanNodeType {
        match self {
            PlanNodeKind::Singleton => PlanNodeType::Singleton,
            PlanNodeKind::EnumerateCollection { .. } => PlanNodeType::EnumerateCollection,
            PlanNodeKind::Index { .. } => PlanNodeType::Index,
            PlanNodeKind::EnumerateList { .. } => PlanNodeType::EnumerateList,
            PlanNodeKind::Calculation { .. } => PlanNodeType::Calculation,
            PlanNodeKind::Filter { .. } => PlanNodeType::Filter,
            PlanNodeKind::Sort { .. } => PlanNodeType::Sort,
            PlanNodeKind::Limit { .. } => PlanNodeType::Limit,
            PlanNodeKind::Collect { .. } => PlanNodeType::Collect,
            PlanNodeKind::Subquery { .. } => PlanNodeType::Subquery,
            PlanNodeKind::Return { .. } => PlanNodeType::Return,
            PlanNodeKind::NoResults => PlanNodeType::NoResults,
            PlanNodeKind::Scatter => PlanNodeType::Scatter,
            PlanNodeKind::Gather { .. } => PlanNodeType::Gather,
            PlanNodeKind::Distribute { .. } => PlanNodeType::Distribute,
            PlanNodeKind::Remote { .. } => PlanNodeType::Remote,
            PlanNodeKind::Traversal { .. } => PlanNodeType::Traversal,
            PlanNodeKind::ShortestPath { .. } => PlanNodeType::ShortestPath,
            PlanNodeKind::Insert { .. } => PlanNodeType::Insert,
            PlanNodeKind::Update { .. } => PlanNodeType::Update,
            PlanNodeKind::Replace { .. } => PlanNodeType::Replace,
            PlanNodeKind::Remove { .. } => PlanNodeType::Remove,
            PlanNodeKind::Upsert { .. } => PlanNodeType::Upsert,
        }
    }

    /// 节点产生的变量
    pub fn variables_set(&self) -> Vec<VariableId> {
        match self {
            PlanNodeKind::EnumerateCollection { out, .. }
            | PlanNodeKind::Index { out, .. }
            | PlanNodeKind::EnumerateList { out, .. }
            | PlanNodeKind::Calculation { out, .. }
            | PlanNodeKind::Subquery { out, .. } => vec![*out],
            PlanNodeKind::Collect {
                groups,
                aggregates,
                into,
            } => groups
                .iter()
                .map(|g| g.out)
                .chain(aggregates.iter().map(|a| a.out))
                .chain(into.iter().map(|i| i.out))
                .collect(),
            PlanNodeKind::Traversal {
                vertex_out,
                edge_out,
                path_out,
                ..
            } => std::iter::once(*vertex_out)
                .chain(*edge_out)
                .chain(*path_out)
                .collect(),
            PlanNodeKind::ShortestPath {
                vertex_out,
                edge_out,
                ..
            } => std::iter::once(*vertex_out).chain(*edge_out).collect(),
            PlanNodeKind::Insert { out_new, .. } | PlanNodeKind::Upsert { out_new, .. } => {
                out_new.iter().copied().collect()
            }
            PlanNodeKind::Update {
                out_old, out_new, ..
            }
            | PlanNodeKind::Replace {
                out_old, out_new, ..
            } => out_old.iter().chain(out_new.iter()).copied().collect(),
            PlanNodeKind::Remove { out_old, .. } => out_old.iter().copied().collect(),
            PlanNodeKind::Singleton
            | PlanNodeKind::Filter { .. }
            | PlanNodeKind::Sort { .. }
            | PlanNodeKind::Limit { .. }
            | PlanNodeKind::Return { .. }
            | PlanNodeKind::NoResults
            | PlanNodeKind::Scatter
            | PlanNodeKind::Gather { .. }
            | PlanNodeKind::Distribute { .. }
            | PlanNodeKind::Remote { .. } => Vec::new(),
        }
    }

    /// 节点自身读取的变量；子查询体内读取的外层变量由 `ExecutionPlan::variables_used` 补充
    pub fn variables_used(&self) -> Vec<VariableId> {
        let mut used: Vec<VariableId> = match self {
            PlanNodeKind::Index { condition, .. } => condition.variables(),
            PlanNodeKind::EnumerateList { input, .. }
            | PlanNodeKind::Filter { input }
            | PlanNodeKind::Return { input }
            | PlanNodeKind::Distribute { input, .. }
            | PlanNodeKind::Insert { input, .. }
            | PlanNodeKind::Remove { input, .. } => vec![*input],
            PlanNodeKind::Calculation { expression, .. } => {
                expression.variables().into_iter().collect()
            }
            PlanNodeKind::Sort { elements, .. } => elements.iter().map(|e| e.variable).collect(),
            PlanNodeKind::Collect {
                groups,
                aggregates,
                into,
            } => groups
                .iter()
                .map(|g| g.input)
                .chain(aggregates.iter().filter_map(|a| a.input))
                .chain(into.iter().filter_map(|i| i.projection))
                .collect(),
            PlanNodeKind::Gather { elements } => elements.iter().map(|e| e.variable).collect(),
            PlanNodeKind::Traversal { start, .. } => vec![*start],
            PlanNodeKind::ShortestPath { start, target, .. } => vec![*start, *target],
            PlanNodeKind::Update { key, input, .. } | PlanNodeKind::Replace { key, input, .. } => {
                key.iter().copied().chain(std::iter::once(*input)).collect()
            }
            PlanNodeKind::Upsert {
                search,
                insert,
                update,
                ..
            } => vec![*search, *insert, *update],
            PlanNodeKind::Singleton
            | PlanNodeKind::EnumerateCollection { .. }
            | PlanNodeKind::Limit { .. }
            | PlanNodeKind::Subquery { .. }
            | PlanNodeKind::NoResults
            | PlanNodeKind::Scatter
            | PlanNodeKind::Remote { .. } => Vec::new(),
        };
        used.sort();
        used.dedup();
        used
    }

    /// 按映射替换读取的变量
    pub fn replace_variables(&mut self, replacements: &HashMap<VariableId, VariableId>) {
        let swap = |v: &mut VariableId| {
            if let Some(target) = replacements.get(v) {
                *v = *target;
            }
        };
        match self {
            PlanNodeKind::Index { condition, .. } => {
                for clause in &mut condition.clauses {
                    clause.value.replace_variables(replacements);
                }
            }
            PlanNodeKind::EnumerateList { input, .. }
            | PlanNodeKind::Filter { input }
            | PlanNodeKind::Return { input }
            | PlanNodeKind::Distribute { input, .. }
            | PlanNodeKind::Insert { input, .. }
            | PlanNodeKind::Remove { input, .. } => swap(input),
            PlanNodeKind::Calculation { expression, .. } => {
                expression.replace_variables(replacements);
            }
            PlanNodeKind::Sort { elements, .. } => {
                for element in elements {
                    swap(&mut element.variable);
                }
            }
            PlanNodeKind::Collect {
                groups,
                aggregates,
                into,
            } => {
                for group in groups {
                    swap(&mut group.input);
                }
                for aggregate in aggregates {
                    if let Some(input) = &mut aggregate.input {
                        swap(input);
                    }
                }
                if let Some(CollectInto {
                    projection: Some(projection),
                    ..
                }) = into
                {
                    swap(projection);
                }
            }
            PlanNodeKind::Gather { elements } => {
                for element in elements {
                    swap(&mut element.variable);
                }
            }
            PlanNodeKind::Traversal { start, .. } => swap(start),
            PlanNodeKind::ShortestPath { start, target, .. } => {
                swap(start);
                swap(target);
            }
            PlanNodeKind::Update { key, input, .. } | PlanNodeKind::Replace { key, input, .. } => {
                if let Some(key) = key {
                    swap(key);
                }
                swap(input);
            }
            PlanNodeKind::Upsert {
                search,
                insert,
                update,
                ..
            } => {
                swap(search);
                swap(insert);
                swap(update);
            }
            PlanNodeKind::Singleton
            | PlanNodeKind::EnumerateCollection { .. }
            | PlanNodeKind::Limit { .. }
            | PlanNodeKind::Subquery { .. }
            | PlanNodeKind::NoResults
            | PlanNodeKind::Scatter
            | PlanNodeKind::Remote { .. } => {}
        }
    }

    /// 读取的集合（explain 的 `collections` 字段）
    pub fn collection(&self) -> Option<&str> {
        match self {
            PlanNodeKind::EnumerateCollection { collection, .. }
            | PlanNodeKind::Index { collection, .. }
            | PlanNodeKind::Distribute { collection, .. }
            | PlanNodeKind::Remote { collection, .. }
            | PlanNodeKind::Insert { collection, .. }
            | PlanNodeKind::Update { collection, .. }
            | PlanNodeKind::Replace { collection, .. }
            | PlanNodeKind::Remove { collection, .. }
            | PlanNodeKind::Upsert { collection, .. } => Some(collection),
            PlanNodeKind::Traversal {
                edge_collection, ..
            }
            | PlanNodeKind::ShortestPath {
                edge_collection, ..
            } => Some(edge_collection),
            _ => None,
        }
    }

    /// 计算节点的表达式
    pub fn expression(&self) -> Option<&Expression> {
        match self {
            PlanNodeKind::Calculation { expression, .. } => Some(expression),
            _ => None,
        }
    }
}

/// 计划节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub id: NodeId,
    pub dependencies: Vec<NodeId>,
    pub kind: PlanNodeKind,
}

impl PlanNode {
    pub fn new(id: NodeId, kind: PlanNodeKind) -> Self {
        Self {
            id,
            dependencies: Vec::new(),
            kind,
        }
    }

    pub fn node_type(&self) -> PlanNodeType {
        self.kind.node_type()
    }

    /// 第一个（通常也是唯一的）依赖
    pub fn dependency(&self) -> Option<NodeId> {
        self.dependencies.first().copied()
    }
}
