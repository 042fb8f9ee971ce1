//! 集成测试共享工具模块
//!
//! 提供测试数据、引擎构造和结果比较的辅助函数，供所有集成测试使用

#![allow(dead_code)]

pub mod assertions;
pub mod data_fixtures;

use std::sync::Arc;

use serde_json::{Map, Value};

use aql_optimizer::config::{ClusterConfig, Config, OptimizerConfig};
use aql_optimizer::query::optimizer::QueryOptions;
use aql_optimizer::query::planner::plan::ExecutionPlan;
use aql_optimizer::query::{ExecuteResult, ExplainResult, QueryEngine};
use aql_optimizer::storage::MemoryStorage;

/// 单机模式的引擎
pub fn engine(storage: Arc<MemoryStorage>) -> QueryEngine {
    QueryEngine::new(storage, Config::default())
}

/// 集群模式的引擎
pub fn cluster_engine(storage: Arc<MemoryStorage>, shards: usize) -> QueryEngine {
    let config = Config {
        optimizer: OptimizerConfig {
            cluster: ClusterConfig::with_shards(shards),
            ..Default::default()
        },
        ..Default::default()
    };
    QueryEngine::new(storage, config)
}

/// `optimizer.rules` 选项
pub fn rules(tokens: &[&str]) -> QueryOptions {
    QueryOptions::default().with_rules(tokens)
}

pub fn explain(engine: &QueryEngine, plan: ExecutionPlan, options: &QueryOptions) -> ExplainResult {
    engine
        .explain(plan, options)
        .unwrap_or_else(|e| panic!("explain 失败: {}", e))
}

pub fn execute(engine: &QueryEngine, plan: ExecutionPlan, options: &QueryOptions) -> ExecuteResult {
    engine
        .execute(plan, &Map::new(), options)
        .unwrap_or_else(|e| panic!("execute 失败: {}", e))
}

/// 执行并只取结果
pub fn results(engine: &QueryEngine, plan: ExecutionPlan, options: &QueryOptions) -> Vec<Value> {
    execute(engine, plan, options).json
}

/// 绑定参数
pub fn bind_vars(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}
