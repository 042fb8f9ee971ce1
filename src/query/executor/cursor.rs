//! 查询游标
//!
//! 按批次拉取结果，每批至多 `batch_size` 个值。每次取批次前检查终止标记，
//! 被终止的查询返回 1500 错误并不再产出数据。

use std::time::Instant;

use log::{debug, warn};

use crate::core::error::{QueryError, QueryResult};
use crate::core::types::VariableId;
use crate::core::{Value, Warning};
use crate::query::executor::blocks::{register, ExecutionBlock};
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::stats::ExecutionStats;
use crate::query::query_manager::{QueryGuard, QueryStatus};

#[derive(Debug)]
pub struct QueryCursor {
    root: Box<dyn ExecutionBlock>,
    ctx: ExecutionContext,
    result: Option<VariableId>,
    batch_size: usize,
    guard: Option<QueryGuard>,
    clock: Instant,
    exhausted: bool,
}

impl QueryCursor {
    /// 以空寄存器行初始化根块并创建游标
    pub fn open(
        mut root: Box<dyn ExecutionBlock>,
        mut ctx: ExecutionContext,
        result: Option<VariableId>,
        batch_size: usize,
        guard: Option<QueryGuard>,
    ) -> QueryResult<Self> {
        let clock = Instant::now();
        root.initialize(&mut ctx, &Vec::new())?;
        Ok(Self {
            root,
            ctx,
            result,
            batch_size: batch_size.max(1),
            guard,
            clock,
            exhausted: false,
        })
    }

    /// 登记的查询 id
    pub fn id(&self) -> Option<u64> {
        self.guard.as_ref().map(QueryGuard::id)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// 下一批结果；返回空批次表示已经读完
    pub fn next_batch(&mut self) -> QueryResult<Vec<Value>> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        if self.guard.as_ref().map(QueryGuard::is_killed).unwrap_or(false) {
            warn!("Query {:?} was killed, aborting cursor", self.id());
            self.finish(QueryStatus::Killed);
            return Err(QueryError::Killed);
        }

        let mut values = Vec::with_capacity(self.batch_size);
        while values.len() < self.batch_size {
            let rows = match self.root.get_some(&mut self.ctx, self.batch_size - values.len()) {
                Ok(rows) => rows,
                Err(e) => {
                    self.finish(QueryStatus::Failed);
                    return Err(e);
                }
            };
            if rows.is_empty() {
                self.finish(QueryStatus::Finished);
                break;
            }
            if let Some(result) = self.result {
                values.extend(rows.iter().map(|row| register(row, result)));
            }
        }
        debug!("Cursor produced batch of {} values", values.len());
        Ok(values)
    }

    /// 读完剩余的全部结果
    pub fn collect_all(&mut self) -> QueryResult<Vec<Value>> {
        let mut all = Vec::new();
        while self.has_more() {
            all.extend(self.next_batch()?);
        }
        Ok(all)
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.ctx.stats
    }

    pub fn warnings(&self) -> &[Warning] {
        self.ctx.warnings.as_slice()
    }

    /// 消耗游标，返回统计与警告
    pub fn into_parts(mut self) -> (ExecutionStats, Vec<Warning>) {
        if !self.exhausted {
            self.finish(QueryStatus::Finished);
        }
        let warnings = std::mem::take(&mut self.ctx.warnings).into_vec();
        (std::mem::take(&mut self.ctx.stats), warnings)
    }

    fn finish(&mut self, status: QueryStatus) {
        self.exhausted = true;
        self.ctx.stats.execution_time = self.clock.elapsed().as_secs_f64();
        if let Some(mut guard) = self.guard.take() {
            guard.set_status(status);
        }
    }
}
