//! 集群执行块：Scatter、Distribute、Remote、Gather
//!
//! 单进程模拟分片执行。Gather 为每个分片设置 `ExecutionContext::shard` 后重新
//! 初始化并读完其下的部分，底层扫描只读取当前分片的文档。Scatter 在第一次
//! 读取时缓存上游结果，之后每个分片重放同一份数据。

use std::cmp::Ordering;
use std::collections::VecDeque;

use log::debug;

use crate::core::error::QueryResult;
use crate::core::types::VariableId;
use crate::core::value::{compare_values, get_path};
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};
use crate::query::planner::plan::SortPath;
use crate::storage::ShardSpec;

use super::{drain, register, ExecutionBlock};

/// Scatter/Distribute 执行块
///
/// 带 `distribute` 变量时是 Distribute：重放时只保留文档键落在当前分片的行。
#[derive(Debug)]
pub struct ScatterBlock {
    dependency: Box<dyn ExecutionBlock>,
    distribute: Option<VariableId>,
    batch_size: usize,
    input: Option<Row>,
    buffer: Option<Vec<Row>>,
    position: usize,
}

impl ScatterBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, batch_size: usize) -> Self {
        Self {
            dependency,
            distribute: None,
            batch_size: batch_size.max(1),
            input: None,
            buffer: None,
            position: 0,
        }
    }

    pub fn distribute(dependency: Box<dyn ExecutionBlock>, input: VariableId, batch_size: usize) -> Self {
        Self {
            distribute: Some(input),
            ..Self::new(dependency, batch_size)
        }
    }

    fn accepts(&self, shard: Option<ShardSpec>, row: &Row) -> bool {
        match (self.distribute, shard) {
            (Some(variable), Some(shard)) => shard.contains(&shard_key(&register(row, variable))),
            _ => true,
        }
    }
}

/// 文档的分片键：对象取 `_key`，字符串取 `collection/key` 中的键部分
fn shard_key(value: &Value) -> String {
    match value {
        Value::Object(map) => match map.get("_key") {
            Some(Value::String(key)) => key.clone(),
            _ => value.to_string(),
        },
        Value::String(s) => s.rsplit('/').next().unwrap_or(s).to_string(),
        other => other.to_string(),
    }
}

impl ExecutionBlock for ScatterBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.position = 0;
        if self.buffer.is_some() && self.input.as_ref() == Some(input) {
            return Ok(());
        }
        self.buffer = None;
        self.input = Some(input.clone());
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        if self.buffer.is_none() {
            // 上游属于协调者部分，不按分片过滤
            let shard = ctx.shard();
            ctx.set_shard(None);
            let rows = drain(self.dependency.as_mut(), ctx, self.batch_size);
            ctx.set_shard(shard);
            self.buffer = Some(rows?);
        }
        let shard = ctx.shard();
        let mut out = Vec::new();
        while out.len() < at_most {
            let Some(row) = self.buffer.as_ref().and_then(|b| b.get(self.position)) else {
                break;
            };
            self.position += 1;
            if self.accepts(shard, row) {
                out.push(row.clone());
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        if self.distribute.is_some() {
            "DistributeBlock"
        } else {
            "ScatterBlock"
        }
    }
}

/// Remote 执行块：转发行，并把每次拉取计为一次请求
#[derive(Debug)]
pub struct RemoteBlock {
    dependency: Box<dyn ExecutionBlock>,
    server: String,
}

impl RemoteBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, server: impl Into<String>) -> Self {
        Self {
            dependency,
            server: server.into(),
        }
    }
}

impl ExecutionBlock for RemoteBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        ctx.stats.http_requests += 1;
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        ctx.stats.http_requests += 1;
        self.dependency.get_some(ctx, at_most)
    }

    fn name(&self) -> &'static str {
        "RemoteBlock"
    }
}

/// Gather 执行块：逐分片执行其下部分并合并
///
/// 有归并条件时各分片的输出已按该条件有序，做 k 路归并，相等时分片编号小的
/// 在前；没有归并条件时按分片顺序拼接。
#[derive(Debug)]
pub struct GatherBlock {
    dependency: Box<dyn ExecutionBlock>,
    elements: Vec<SortPath>,
    batch_size: usize,
    input: Row,
    output: Option<VecDeque<Row>>,
}

impl GatherBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, elements: Vec<SortPath>, batch_size: usize) -> Self {
        Self {
            dependency,
            elements,
            batch_size: batch_size.max(1),
            input: Vec::new(),
            output: None,
        }
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for element in &self.elements {
            let left = get_path(&register(a, element.variable), &element.path);
            let right = get_path(&register(b, element.variable), &element.path);
            let ord = compare_values(&left, &right);
            let ord = if element.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn run_shards(&mut self, ctx: &mut ExecutionContext) -> QueryResult<Vec<VecDeque<Row>>> {
        let shards = ctx.shards();
        let mut parts = Vec::with_capacity(shards);
        for index in 0..shards {
            ctx.set_shard(Some(ShardSpec::new(index, shards)));
            self.dependency.initialize(ctx, &self.input)?;
            let rows = drain(self.dependency.as_mut(), ctx, self.batch_size)?;
            debug!("Gather received {} rows from shard {}", rows.len(), index);
            parts.push(VecDeque::from(rows));
        }
        Ok(parts)
    }

    fn merge(&self, mut parts: Vec<VecDeque<Row>>) -> VecDeque<Row> {
        if self.elements.is_empty() {
            return parts.into_iter().flatten().collect();
        }
        let mut merged = VecDeque::with_capacity(parts.iter().map(VecDeque::len).sum());
        loop {
            let mut best: Option<usize> = None;
            for (index, part) in parts.iter().enumerate() {
                let Some(head) = part.front() else { continue };
                let better = match best.and_then(|b| parts[b].front()) {
                    Some(current) => self.compare(head, current) == Ordering::Less,
                    None => true,
                };
                if better {
                    best = Some(index);
                }
            }
            match best.and_then(|b| parts[b].pop_front()) {
                Some(row) => merged.push_back(row),
                None => return merged,
            }
        }
    }
}

impl ExecutionBlock for GatherBlock {
    fn initialize(&mut self, _ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.input = input.clone();
        self.output = None;
        Ok(())
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        if self.output.is_none() {
            let previous = ctx.shard();
            let parts = self.run_shards(ctx);
            ctx.set_shard(previous);
            self.output = Some(self.merge(parts?));
        }
        let Some(output) = self.output.as_mut() else {
            return Ok(Vec::new());
        };
        let take = at_most.min(output.len());
        Ok(output.drain(..take).collect())
    }

    fn name(&self) -> &'static str {
        "GatherBlock"
    }
}
