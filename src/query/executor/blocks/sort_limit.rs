//! 排序与分页执行块

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::core::error::QueryResult;
use crate::core::value::compare_values;
use crate::query::executor::context::{ExecutionContext, Row};
use crate::query::planner::plan::SortElement;

use super::{drain, register, ExecutionBlock};

/// 按行比较排序条件
pub fn compare_rows(elements: &[SortElement], a: &Row, b: &Row) -> Ordering {
    for element in elements {
        let ord = compare_values(&register(a, element.variable), &register(b, element.variable));
        let ord = if element.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// 物化全部输入后稳定排序
#[derive(Debug)]
pub struct SortBlock {
    dependency: Box<dyn ExecutionBlock>,
    elements: Vec<SortElement>,
    sorted: Option<VecDeque<Row>>,
    memory: u64,
}

impl SortBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, elements: Vec<SortElement>) -> Self {
        Self {
            dependency,
            elements,
            sorted: None,
            memory: 0,
        }
    }
}

impl ExecutionBlock for SortBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.sorted = None;
        ctx.release_memory(std::mem::take(&mut self.memory));
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        if self.sorted.is_none() {
            let mut rows = drain(self.dependency.as_mut(), ctx, at_most.max(1))?;
            self.memory = ctx.track_memory(&rows);
            // sort_by 是稳定排序，相等的行保持输入顺序
            rows.sort_by(|a, b| compare_rows(&self.elements, a, b));
            self.sorted = Some(rows.into());
        }
        let Some(sorted) = self.sorted.as_mut() else {
            return Ok(Vec::new());
        };
        let take = at_most.min(sorted.len());
        let batch: Vec<Row> = sorted.drain(..take).collect();
        if sorted.is_empty() {
            ctx.release_memory(std::mem::take(&mut self.memory));
        }
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "SortBlock"
    }
}

/// 跳过 `offset` 行后最多返回 `count` 行
///
/// `full_count` 时在配额用完后继续读完上游，把总行数写入执行统计。
#[derive(Debug)]
pub struct LimitBlock {
    dependency: Box<dyn ExecutionBlock>,
    offset: u64,
    count: u64,
    full_count: bool,
    skipped: u64,
    returned: u64,
    seen: u64,
    done: bool,
}

impl LimitBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, offset: u64, count: u64, full_count: bool) -> Self {
        Self {
            dependency,
            offset,
            count,
            full_count,
            skipped: 0,
            returned: 0,
            seen: 0,
            done: false,
        }
    }

    fn finish(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<()> {
        self.done = true;
        if self.full_count {
            loop {
                let batch = self.dependency.get_some(ctx, at_most.max(1))?;
                if batch.is_empty() {
                    break;
                }
                self.seen += batch.len() as u64;
            }
            ctx.stats.full_count = Some(self.seen);
        }
        Ok(())
    }
}

impl ExecutionBlock for LimitBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.skipped = 0;
        self.returned = 0;
        self.seen = 0;
        self.done = false;
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        let mut out = Vec::new();
        while !self.done && out.len() < at_most {
            if self.returned >= self.count {
                self.finish(ctx, at_most)?;
                break;
            }
            let batch = self.dependency.get_some(ctx, at_most)?;
            if batch.is_empty() {
                self.done = true;
                if self.full_count {
                    ctx.stats.full_count = Some(self.seen);
                }
                break;
            }
            self.seen += batch.len() as u64;
            for row in batch {
                if self.skipped < self.offset {
                    self.skipped += 1;
                } else if self.returned < self.count {
                    self.returned += 1;
                    out.push(row);
                }
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "LimitBlock"
    }
}
