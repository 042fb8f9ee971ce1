//! 执行块
//!
//! 每个计划节点对应一个执行块，执行块按批向上游拉取行。
//!
//! 生命周期：
//! 1. `initialize(input)`：以一行外部输入（主查询为空寄存器行，子查询为外层当前行）
//!    重置块及其上游
//! 2. `get_some(at_most)`：返回至多 `at_most` 行，返回空批次表示已耗尽
//!
//! - `basic`：Singleton、Calculation、Filter、Return、NoResults
//! - `enumerate`：EnumerateCollection、Index、EnumerateList
//! - `sort_limit`：Sort、Limit
//! - `collect`：Collect
//! - `subquery`：Subquery
//! - `cluster`：Scatter、Distribute、Remote、Gather
//! - `graph`：Traversal、ShortestPath
//! - `modification`：Insert、Update、Replace、Remove、Upsert

use std::collections::VecDeque;
use std::fmt;

use crate::core::error::QueryResult;
use crate::core::types::VariableId;
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};

pub mod basic;
pub mod cluster;
pub mod collect;
pub mod enumerate;
pub mod graph;
pub mod modification;
pub mod sort_limit;
pub mod subquery;

pub use basic::{CalculationBlock, FilterBlock, NoResultsBlock, ReturnBlock, SingletonBlock};
pub use cluster::{GatherBlock, RemoteBlock, ScatterBlock};
pub use collect::CollectBlock;
pub use enumerate::{EnumerateCollectionBlock, EnumerateListBlock, IndexBlock};
pub use graph::{ShortestPathBlock, TraversalBlock};
pub use modification::{ModificationBlock, ModificationKind};
pub use sort_limit::{LimitBlock, SortBlock};
pub use subquery::SubqueryBlock;

/// 执行块接口
pub trait ExecutionBlock: fmt::Debug + Send {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()>;

    /// 返回至多 `at_most` 行；空批次表示没有更多数据
    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>>;

    fn name(&self) -> &'static str;
}

/// 把上游全部行读完
pub fn drain(
    block: &mut dyn ExecutionBlock,
    ctx: &mut ExecutionContext,
    batch_size: usize,
) -> QueryResult<Vec<Row>> {
    let mut rows = Vec::new();
    loop {
        let batch = block.get_some(ctx, batch_size)?;
        if batch.is_empty() {
            return Ok(rows);
        }
        rows.extend(batch);
    }
}

/// 对每行输入展开若干行输出
pub trait RowExpander: fmt::Debug + Send {
    fn expand(&mut self, ctx: &mut ExecutionContext, input: Row) -> QueryResult<Vec<Row>>;

    fn name(&self) -> &'static str;
}

/// 逐行展开型执行块的公共循环
#[derive(Debug)]
pub struct ExpandingBlock<E: RowExpander> {
    dependency: Box<dyn ExecutionBlock>,
    expander: E,
    pending: VecDeque<Row>,
    upstream_done: bool,
}

impl<E: RowExpander> ExpandingBlock<E> {
    pub fn with_expander(dependency: Box<dyn ExecutionBlock>, expander: E) -> Self {
        Self {
            dependency,
            expander,
            pending: VecDeque::new(),
            upstream_done: false,
        }
    }
}

impl<E: RowExpander> ExecutionBlock for ExpandingBlock<E> {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.pending.clear();
        self.upstream_done = false;
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        let mut out = Vec::new();
        while out.len() < at_most {
            if let Some(row) = self.pending.pop_front() {
                out.push(row);
                continue;
            }
            if self.upstream_done {
                break;
            }
            let batch = self.dependency.get_some(ctx, at_most)?;
            if batch.is_empty() {
                self.upstream_done = true;
                continue;
            }
            for row in batch {
                self.pending.extend(self.expander.expand(ctx, row)?);
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        self.expander.name()
    }
}

/// 向寄存器写入变量值，寄存器不够长时补 null
pub fn set_register(row: &mut Row, variable: VariableId, value: Value) {
    let index = variable.index();
    if row.len() <= index {
        row.resize(index + 1, Value::Null);
    }
    row[index] = value;
}

/// 读取寄存器，越界时返回 null
pub fn register(row: &Row, variable: VariableId) -> Value {
    row.get(variable.index()).cloned().unwrap_or(Value::Null)
}
