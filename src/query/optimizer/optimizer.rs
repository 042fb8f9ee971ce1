//! 优化器入口
//!
//! 一次优化调用的流程：
//!
//! 1. 校验初始计划
//! 2. 按 `optimizer.rules` 得到本次启用的规则集合，未知规则记为警告
//! 3. `PlanRewriter` 把所有启用的规则跑到不动点，得到候选计划
//! 4. 并行估算每个候选的代价，按代价排序，第一个即选中的计划
//!
//! 注册表在构建后只读，多个查询可以共享同一个 `Optimizer`。

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::config::{Config, OptimizerConfig};
use crate::core::error::OptimizeResult;
use crate::core::{Warning, WarningCollector};
use crate::query::optimizer::cost::{
    CandidateSummary, CostAssigner, CostModelConfig, PlanCost, PlanSelector,
};
use crate::query::optimizer::options::QueryOptions;
use crate::query::planner::plan::ExecutionPlan;
use crate::query::planner::rewrite::{PlanRewriter, RewriteContext, RuleFilter, RuleRegistry};

/// 候选计划
#[derive(Debug, Clone)]
pub struct CandidatePlan {
    pub plan: ExecutionPlan,
    /// 应用过的规则，按首次应用的顺序
    pub applied_rules: Vec<String>,
    pub estimated_cost: f64,
    pub cost: PlanCost,
}

/// 优化结果，候选计划按选择顺序排列
#[derive(Debug, Clone)]
pub struct OptimizerResult {
    pub plans: Vec<CandidatePlan>,
    pub warnings: Vec<Warning>,
}

impl OptimizerResult {
    /// 选中的计划
    pub fn best(&self) -> Option<&CandidatePlan> {
        self.plans.first()
    }

    pub fn into_best(self) -> Option<CandidatePlan> {
        self.plans.into_iter().next()
    }
}

/// 优化器
#[derive(Debug, Clone)]
pub struct Optimizer {
    registry: Arc<RuleRegistry>,
    config: OptimizerConfig,
    cost_config: CostModelConfig,
}

impl Optimizer {
    pub fn new(registry: Arc<RuleRegistry>, config: OptimizerConfig, cost_config: CostModelConfig) -> Self {
        Self {
            registry,
            config,
            cost_config,
        }
    }

    /// 使用内置规则注册表
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(RuleRegistry::default()),
            config.optimizer.clone(),
            config.cost,
        )
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// 优化计划，返回按代价排序的候选计划
    pub fn optimize(
        &self,
        ctx: &mut RewriteContext,
        plan: ExecutionPlan,
        options: &QueryOptions,
    ) -> OptimizeResult<OptimizerResult> {
        plan.validate()?;

        let mut warnings = WarningCollector::default();
        let selection = RuleFilter::parse(&options.optimizer.rules).apply(&self.registry, &mut warnings);
        let max_plans = options
            .max_number_of_plans
            .unwrap_or(self.config.max_number_of_plans);

        let rewriter = PlanRewriter::new(self.registry.clone())
            .with_max_iterations(self.config.max_iterations)
            .with_max_number_of_plans(max_plans);
        let rewritten = rewriter.rewrite(ctx, plan, &selection)?;
        debug!(
            "Optimizer produced {} candidate plan(s) with {} enabled rule(s)",
            rewritten.len(),
            selection.enabled_count()
        );

        let assigner = self.cost_assigner(ctx, rewritten.iter().map(|c| &c.plan));
        let costs = rewritten
            .par_iter()
            .map(|candidate| assigner.assign_costs(&candidate.plan))
            .collect::<Result<Vec<_>, _>>()?;

        let summaries: Vec<CandidateSummary> = rewritten
            .iter()
            .zip(&costs)
            .map(|(candidate, cost)| CandidateSummary {
                estimated_cost: cost.total_cost,
                node_count: candidate.plan.node_count(),
            })
            .collect();
        let order = PlanSelector::new().rank(&summaries);

        let mut slots: Vec<Option<CandidatePlan>> = rewritten
            .into_iter()
            .zip(costs)
            .map(|(candidate, cost)| {
                Some(CandidatePlan {
                    plan: candidate.plan,
                    applied_rules: candidate.applied_rules,
                    estimated_cost: cost.total_cost,
                    cost,
                })
            })
            .collect();
        let plans: Vec<CandidatePlan> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        if let Some(best) = plans.first() {
            info!(
                "Selected plan with estimated cost {:.2}, rules [{}]",
                best.estimated_cost,
                best.applied_rules.join(", ")
            );
        }

        warnings.extend(ctx.take_warnings());
        Ok(OptimizerResult {
            plans,
            warnings: warnings.into_vec(),
        })
    }

    /// 估算一个计划的代价，不运行任何规则
    pub fn estimate(&self, ctx: &mut RewriteContext, plan: &ExecutionPlan) -> OptimizeResult<PlanCost> {
        let assigner = self.cost_assigner(ctx, std::iter::once(plan));
        Ok(assigner.assign_costs(plan)?)
    }

    /// 文档数在规则运行之后读取，候选计划共用一份
    fn cost_assigner<'a>(
        &self,
        ctx: &mut RewriteContext,
        plans: impl Iterator<Item = &'a ExecutionPlan>,
    ) -> CostAssigner {
        let mut counts = HashMap::new();
        for plan in plans {
            for collection in plan.collections() {
                if counts.contains_key(&collection) {
                    continue;
                }
                if let Some(count) = ctx.collection_count(&collection) {
                    counts.insert(collection, count);
                }
            }
        }
        let shards = if ctx.is_cluster() { ctx.cluster().shards } else { 1 };
        CostAssigner::new(self.cost_config)
            .with_collection_counts(counts)
            .with_shards(shards)
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
