//! 执行上下文
//!
//! 一次查询执行期间所有执行块共享：存储协作方、当前分片、统计与警告。

use std::fmt;
use std::sync::Arc;

use crate::core::error::QueryResult;
use crate::core::types::expression::Expression;
use crate::core::value::estimate_size;
use crate::core::{Value, WarningCollector};
use crate::expression::ExpressionEvaluator;
use crate::query::executor::stats::ExecutionStats;
use crate::storage::{ShardSpec, StorageClient};

/// 一行数据：按变量编号存放的寄存器
pub type Row = Vec<Value>;

/// 执行上下文
pub struct ExecutionContext {
    storage: Arc<dyn StorageClient>,
    pub stats: ExecutionStats,
    pub warnings: WarningCollector,
    shard: Option<ShardSpec>,
    shards: usize,
    memory_usage: u64,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("shard", &self.shard)
            .field("shards", &self.shards)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ExecutionContext {
    pub fn new(storage: Arc<dyn StorageClient>, shards: usize) -> Self {
        Self {
            storage,
            stats: ExecutionStats::default(),
            warnings: WarningCollector::default(),
            shard: None,
            shards: shards.max(1),
            memory_usage: 0,
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    /// 当前执行的分片，协调者部分为 None
    pub fn shard(&self) -> Option<ShardSpec> {
        self.shard
    }

    pub fn set_shard(&mut self, shard: Option<ShardSpec>) {
        self.shard = shard;
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    /// 在一行数据上求值表达式，警告记入上下文
    pub fn evaluate(&mut self, expression: &Expression, row: &Row) -> QueryResult<Value> {
        Ok(ExpressionEvaluator::evaluate(expression, row.as_slice(), &mut self.warnings)?)
    }

    /// 记录物化数据占用，更新峰值
    pub fn track_memory(&mut self, rows: &[Row]) -> u64 {
        let bytes: u64 = rows
            .iter()
            .flat_map(|row| row.iter())
            .map(|v| estimate_size(v) as u64)
            .sum();
        self.memory_usage += bytes;
        self.stats.peak_memory_usage = self.stats.peak_memory_usage.max(self.memory_usage);
        bytes
    }

    pub fn release_memory(&mut self, bytes: u64) {
        self.memory_usage = self.memory_usage.saturating_sub(bytes);
    }
}
