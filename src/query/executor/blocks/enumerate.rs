//! 迭代类执行块：全集合扫描、索引扫描、列表迭代
//!
//! 三者都是"每行输入展开成若干行输出"，共用 `ExpandingBlock` 的拉取循环。

use rand::seq::SliceRandom;

use crate::core::error::{ErrorCode, QueryResult};
use crate::core::types::VariableId;
use crate::core::{Value, Warning};
use crate::index::{IndexCondition, IndexDescriptor, IndexLookup, LookupClause};
use crate::query::executor::context::{ExecutionContext, Row};

use super::{register, set_register, ExecutionBlock, ExpandingBlock, RowExpander};

/// 全集合扫描
#[derive(Debug)]
pub struct CollectionScanner {
    collection: String,
    out: VariableId,
    random: bool,
}

impl RowExpander for CollectionScanner {
    fn expand(&mut self, ctx: &mut ExecutionContext, input: Row) -> QueryResult<Vec<Row>> {
        let mut documents = ctx.storage().scan_full(&self.collection, ctx.shard())?;
        ctx.stats.scanned_full += documents.len() as u64;
        if self.random {
            documents.shuffle(&mut rand::thread_rng());
        }
        Ok(emit(&input, self.out, documents))
    }

    fn name(&self) -> &'static str {
        "EnumerateCollectionBlock"
    }
}

pub type EnumerateCollectionBlock = ExpandingBlock<CollectionScanner>;

impl ExpandingBlock<CollectionScanner> {
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        collection: impl Into<String>,
        out: VariableId,
        random: bool,
    ) -> Self {
        Self::with_expander(
            dependency,
            CollectionScanner {
                collection: collection.into(),
                out,
                random,
            },
        )
    }
}

/// 索引扫描：每行输入先求出查找值，再按索引顺序读取
#[derive(Debug)]
pub struct IndexScanner {
    index: IndexDescriptor,
    condition: IndexCondition,
    out: VariableId,
    reverse: bool,
}

impl IndexScanner {
    fn lookup(&self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<IndexLookup> {
        let mut clauses = Vec::with_capacity(self.condition.clauses.len());
        for clause in &self.condition.clauses {
            clauses.push(LookupClause {
                path: clause.path.clone(),
                op: clause.op,
                value: ctx.evaluate(&clause.value, input)?,
            });
        }
        Ok(IndexLookup::new(clauses))
    }
}

impl RowExpander for IndexScanner {
    fn expand(&mut self, ctx: &mut ExecutionContext, input: Row) -> QueryResult<Vec<Row>> {
        let lookup = self.lookup(ctx, &input)?;
        let documents = ctx
            .storage()
            .scan_index(&self.index.id, &lookup, self.reverse, ctx.shard())?;
        ctx.stats.scanned_index += documents.len() as u64;
        Ok(emit(&input, self.out, documents))
    }

    fn name(&self) -> &'static str {
        "IndexBlock"
    }
}

pub type IndexBlock = ExpandingBlock<IndexScanner>;

impl ExpandingBlock<IndexScanner> {
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        index: IndexDescriptor,
        condition: IndexCondition,
        out: VariableId,
        reverse: bool,
    ) -> Self {
        Self::with_expander(
            dependency,
            IndexScanner {
                index,
                condition,
                out,
                reverse,
            },
        )
    }
}

/// 数组迭代；非数组输入不产出行并记一条警告
#[derive(Debug)]
pub struct ListIterator {
    input: VariableId,
    out: VariableId,
}

impl RowExpander for ListIterator {
    fn expand(&mut self, ctx: &mut ExecutionContext, input: Row) -> QueryResult<Vec<Row>> {
        match register(&input, self.input) {
            Value::Array(items) => Ok(emit(&input, self.out, items)),
            other => {
                ctx.warnings.push(Warning::new(
                    ErrorCode::QueryArrayExpected,
                    format!("collection or array expected as operand to FOR loop, got {}", type_name(&other)),
                ));
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        "EnumerateListBlock"
    }
}

pub type EnumerateListBlock = ExpandingBlock<ListIterator>;

impl ExpandingBlock<ListIterator> {
    pub fn new(dependency: Box<dyn ExecutionBlock>, input: VariableId, out: VariableId) -> Self {
        Self::with_expander(dependency, ListIterator { input, out })
    }
}

fn emit(input: &Row, out: VariableId, values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .map(|value| {
            let mut row = input.clone();
            set_register(&mut row, out, value);
            row
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
