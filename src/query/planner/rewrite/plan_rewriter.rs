//! 计划重写器实现
//!
//! 按 pass 升序驱动注册表中的规则，直到不动点：
//!
//! 1. 对当前计划依次尝试每条启用且模式匹配的规则
//! 2. 规则改动了计划，就从它的重跑 pass 的第一条规则重新开始，并计一次迭代
//! 3. 迭代次数超过上限报 `IterationLimitExceeded`，不做静默截断
//! 4. 规则给出的候选计划作为新的候选，从该规则的下一条规则继续
//!
//! 候选计划总数受 `max_number_of_plans` 限制，超出的候选直接丢弃。

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use log::debug;

use crate::core::error::{OptimizeError, OptimizeResult};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::rule_enum::RuleRegistry;
use crate::query::planner::rewrite::rule_filter::RuleSelection;

/// 重写完成的计划及其应用过的规则（按首次应用的顺序）
#[derive(Debug, Clone)]
pub struct RewrittenPlan {
    pub plan: ExecutionPlan,
    pub applied_rules: Vec<String>,
}

#[derive(Debug)]
struct Pending {
    plan: ExecutionPlan,
    applied_rules: Vec<String>,
    next: usize,
    iterations: usize,
}

impl Pending {
    fn record(&mut self, name: &str) {
        if !self.applied_rules.iter().any(|r| r == name) {
            self.applied_rules.push(name.to_string());
        }
    }
}

/// 计划重写器
#[derive(Debug, Clone)]
pub struct PlanRewriter {
    registry: Arc<RuleRegistry>,
    max_iterations: usize,
    max_number_of_plans: usize,
}

impl PlanRewriter {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self {
            registry,
            max_iterations: 1000,
            max_number_of_plans: 128,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_number_of_plans(mut self, max_number_of_plans: usize) -> Self {
        self.max_number_of_plans = max_number_of_plans.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// 对计划运行全部启用的规则，返回所有候选计划；第一个总是从原计划演化而来
    pub fn rewrite(
        &self,
        ctx: &mut RewriteContext,
        plan: ExecutionPlan,
        selection: &RuleSelection,
    ) -> OptimizeResult<Vec<RewrittenPlan>> {
        let mut queue = VecDeque::new();
        queue.push_back(Pending {
            plan,
            applied_rules: Vec::new(),
            next: 0,
            iterations: 0,
        });
        let mut created = 1usize;
        let mut finished = Vec::new();

        while let Some(mut candidate) = queue.pop_front() {
            self.run_candidate(ctx, &mut candidate, selection, &mut queue, &mut created)?;
            finished.push(RewrittenPlan {
                plan: candidate.plan,
                applied_rules: candidate.applied_rules,
            });
        }
        Ok(finished)
    }

    fn run_candidate(
        &self,
        ctx: &mut RewriteContext,
        candidate: &mut Pending,
        selection: &RuleSelection,
        queue: &mut VecDeque<Pending>,
        created: &mut usize,
    ) -> OptimizeResult<()> {
        let cluster = ctx.is_cluster();
        let mut present: HashSet<PlanNodeType> = candidate.plan.node_types();
        let mut index = candidate.next;

        while let Some(definition) = self.registry.get(index) {
            if !selection.is_enabled(index)
                || !definition.can_run(cluster)
                || !definition.rule.pattern().matches_types(&present)
            {
                index += 1;
                continue;
            }

            let result = definition.rule.apply(ctx, &candidate.plan)?;
            let (replacement, alternatives) = result.split();

            for alternative in alternatives {
                if *created >= self.max_number_of_plans {
                    debug!(
                        "rule '{}' produced more plans than allowed ({}), dropping the rest",
                        definition.name(),
                        self.max_number_of_plans
                    );
                    break;
                }
                *created += 1;
                let mut fork = Pending {
                    plan: alternative,
                    applied_rules: candidate.applied_rules.clone(),
                    next: index + 1,
                    iterations: candidate.iterations,
                };
                fork.record(definition.name());
                queue.push_back(fork);
            }

            match replacement {
                Some(plan) => {
                    candidate.plan = plan;
                    candidate.record(definition.name());
                    candidate.iterations += 1;
                    if candidate.iterations > self.max_iterations {
                        return Err(OptimizeError::IterationLimitExceeded {
                            iterations: candidate.iterations,
                            limit: self.max_iterations,
                        });
                    }
                    present = candidate.plan.node_types();
                    index = self.registry.pass_start(definition.rerun_pass());
                    debug!(
                        "rule '{}' changed the plan, rerunning pass '{}'",
                        definition.name(),
                        definition.rerun_pass()
                    );
                }
                None => index += 1,
            }
        }
        Ok(())
    }
}
