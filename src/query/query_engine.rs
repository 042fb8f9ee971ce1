//! 查询引擎
//!
//! 对外的 explain / execute 入口：
//!
//! 1. 绑定参数（缺失时 1552）
//! 2. 优化器生成候选计划并选出代价最低的一个
//! 3. explain 返回计划描述；execute 构建执行块，通过游标分批取回结果
//!
//! 引擎是 `Send + Sync` 的，多个线程可以共享同一个实例。

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;
use serde_json::Map;

use crate::config::Config;
use crate::core::error::{QueryError, QueryResult};
use crate::core::{Value, Warning, WarningCollector};
use crate::query::executor::{BlockFactory, ExecutionContext, ExecutionStats, QueryCursor};
use crate::query::optimizer::{CandidatePlan, Optimizer, QueryOptions};
use crate::query::planner::plan::{describe, ExecutionPlan, PlanDescription, PlanNodeKind, WalkOrder};
use crate::query::planner::rewrite::RewriteContext;
use crate::query::query_manager::QueryManager;
use crate::storage::StorageClient;

/// explain 结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainResult {
    /// 选中的计划，`rules` 为其应用过的规则
    pub plan: PlanDescription,
    /// `allPlans` 时的全部候选计划，按代价排序
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<PlanDescription>,
    pub warnings: Vec<Warning>,
}

/// 各阶段耗时（秒），`profile` 时返回
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProfile {
    pub optimizing: f64,
    pub executing: f64,
}

/// execute 结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub json: Vec<Value>,
    pub stats: ExecutionStats,
    pub warnings: Vec<Warning>,
    pub plan: PlanDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<QueryProfile>,
}

/// 已优化、可执行的查询
#[derive(Debug)]
pub struct PreparedQuery {
    pub plan: ExecutionPlan,
    pub description: PlanDescription,
    pub warnings: Vec<Warning>,
    pub optimizing: f64,
}

#[derive(Debug)]
pub struct QueryEngine {
    storage: Arc<dyn StorageClient>,
    optimizer: Optimizer,
    config: Config,
    manager: Arc<QueryManager>,
}

impl QueryEngine {
    pub fn new(storage: Arc<dyn StorageClient>, config: Config) -> Self {
        Self {
            storage,
            optimizer: Optimizer::from_config(&config),
            config,
            manager: Arc::new(QueryManager::new()),
        }
    }

    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_query_manager(mut self, manager: Arc<QueryManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn query_manager(&self) -> &Arc<QueryManager> {
        &self.manager
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    fn rewrite_context(&self) -> RewriteContext {
        RewriteContext::with_storage(self.storage.clone()).with_cluster(self.config.optimizer.cluster)
    }

    fn shards(&self) -> usize {
        let cluster = &self.config.optimizer.cluster;
        if cluster.enabled {
            cluster.shards.max(1)
        } else {
            1
        }
    }

    /// 不带绑定参数的 explain
    pub fn explain(&self, plan: ExecutionPlan, options: &QueryOptions) -> QueryResult<ExplainResult> {
        self.explain_with_bind_vars(plan, &Map::new(), options)
    }

    pub fn explain_with_bind_vars(
        &self,
        mut plan: ExecutionPlan,
        bind_vars: &Map<String, Value>,
        options: &QueryOptions,
    ) -> QueryResult<ExplainResult> {
        plan.bind_parameters(bind_vars)?;
        let mut ctx = self.rewrite_context();
        let result = self.optimizer.optimize(&mut ctx, plan, options)?;

        let describe_candidate = |c: &CandidatePlan| describe(&c.plan, &c.cost, &c.applied_rules);
        let best = result
            .best()
            .map(describe_candidate)
            .ok_or_else(|| QueryError::execution_error("优化器没有返回候选计划"))?;
        let plans = if options.all_plans || options.verbose_plans {
            result.plans.iter().map(describe_candidate).collect()
        } else {
            Vec::new()
        };
        Ok(ExplainResult {
            plan: best,
            plans,
            warnings: result.warnings,
        })
    }

    /// 绑定参数并优化，返回选中的计划
    pub fn prepare(
        &self,
        mut plan: ExecutionPlan,
        bind_vars: &Map<String, Value>,
        options: &QueryOptions,
    ) -> QueryResult<PreparedQuery> {
        let clock = Instant::now();
        plan.bind_parameters(bind_vars)?;
        let mut ctx = self.rewrite_context();
        let result = self.optimizer.optimize(&mut ctx, plan, options)?;
        let warnings = result.warnings.clone();
        let best = result
            .into_best()
            .ok_or_else(|| QueryError::execution_error("优化器没有返回候选计划"))?;

        let mut plan = best.plan;
        if options.full_count {
            enable_full_count(&mut plan);
        }
        Ok(PreparedQuery {
            description: describe(&plan, &best.cost, &best.applied_rules),
            plan,
            warnings,
            optimizing: clock.elapsed().as_secs_f64(),
        })
    }

    /// 打开游标，结果通过 `next_batch` 分批读取
    pub fn cursor(
        &self,
        plan: ExecutionPlan,
        bind_vars: &Map<String, Value>,
        options: &QueryOptions,
    ) -> QueryResult<QueryCursor> {
        let prepared = self.prepare(plan, bind_vars, options)?;
        self.open_cursor(&prepared, options)
    }

    /// 打开已准备好的查询
    pub fn open_cursor(&self, prepared: &PreparedQuery, options: &QueryOptions) -> QueryResult<QueryCursor> {
        let batch_size = options.batch_size.unwrap_or(self.config.executor.batch_size).max(1);
        let (root, result) = BlockFactory::new(&prepared.plan, batch_size).build_plan()?;
        let guard = self.manager.register(prepared.description.node_types().join(" -> "));
        debug!("Opening cursor for query {} with batch size {}", guard.id(), batch_size);
        let ctx = ExecutionContext::new(self.storage.clone(), self.shards());
        QueryCursor::open(root, ctx, result, batch_size, Some(guard))
    }

    /// 执行计划并读完全部结果
    pub fn execute(
        &self,
        plan: ExecutionPlan,
        bind_vars: &Map<String, Value>,
        options: &QueryOptions,
    ) -> QueryResult<ExecuteResult> {
        let prepared = self.prepare(plan, bind_vars, options)?;
        let clock = Instant::now();
        let mut cursor = self.open_cursor(&prepared, options)?;
        let json = cursor.collect_all()?;
        let (stats, execution_warnings) = cursor.into_parts();
        let executing = clock.elapsed().as_secs_f64();

        let mut warnings = WarningCollector::default();
        warnings.extend(prepared.warnings);
        warnings.extend(execution_warnings);

        info!(
            "Query returned {} rows (scanned full {}, index {}, {} writes) in {:.3}s",
            json.len(),
            stats.scanned_full,
            stats.scanned_index,
            stats.writes_executed,
            executing
        );

        Ok(ExecuteResult {
            json,
            stats,
            warnings: warnings.into_vec(),
            plan: prepared.description,
            profile: options.profile.then_some(QueryProfile {
                optimizing: prepared.optimizing,
                executing,
            }),
        })
    }
}

/// 主查询链上最靠近结果的 LIMIT 统计 fullCount
fn enable_full_count(plan: &mut ExecutionPlan) {
    let Some(root) = plan.root() else {
        return;
    };
    let limit = plan
        .walk_from(root, WalkOrder::Reverse)
        .find(|node| matches!(node.kind, PlanNodeKind::Limit { .. }))
        .map(|node| node.id);
    if let Some(PlanNodeKind::Limit { full_count, .. }) = limit.and_then(|id| plan.node_mut(id)).map(|node| &mut node.kind) {
        *full_count = true;
    }
}
