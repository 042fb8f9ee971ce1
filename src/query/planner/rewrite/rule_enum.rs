//! 重写规则枚举与规则注册表
//!
//! 内置规则作为枚举变体静态分发；测试或扩展代码注册的规则走 `Custom` 变体。
//!
//! 注册表在进程启动时构建一次，之后只读，通过 `Arc` 在查询之间共享。
//! 规则按 pass 升序排列，同一 pass 内保持注册顺序；每次优化调用的启用状态
//! 由 `RuleFilter` 计算成位图，不修改注册表本身。
//!
//! # 使用示例
//!
//! ```rust
//! use aql_optimizer::query::planner::rewrite::{RulePass, RuleRegistry};
//!
//! let registry = RuleRegistry::default();
//! let start = registry.pass_start(RulePass::Index);
//! assert_eq!(registry.get(start).map(|d| d.name()), Some("use-indexes"));
//! ```

use std::fmt;

use crate::core::error::{OptimizeError, OptimizeResult};
use crate::query::planner::plan::ExecutionPlan;
use crate::query::planner::rewrite::cluster;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::elimination;
use crate::query::planner::rewrite::index;
use crate::query::planner::rewrite::movement;
use crate::query::planner::rewrite::normalization;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::permutation;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule as RewriteRuleTrait;

macro_rules! define_rewrite_rules {
    (
        $(#[$enum_meta:meta])*
        pub enum $enum_name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant_name:ident($rule_type:ty)
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug)]
        pub enum $enum_name {
            $(
                $(#[$variant_meta])*
                $variant_name($rule_type),
            )+
            /// 内置规则之外注册的规则
            Custom(Box<dyn RewriteRuleTrait>),
        }

        impl $enum_name {
            pub fn name(&self) -> &'static str {
                match self {
                    $(
                        $enum_name::$variant_name(rule) => rule.name(),
                    )+
                    $enum_name::Custom(rule) => rule.name(),
                }
            }

            pub fn pattern(&self) -> Pattern {
                match self {
                    $(
                        $enum_name::$variant_name(rule) => rule.pattern(),
                    )+
                    $enum_name::Custom(rule) => rule.pattern(),
                }
            }

            pub fn apply(
                &self,
                ctx: &mut RewriteContext,
                plan: &ExecutionPlan,
            ) -> RewriteResult<TransformResult> {
                match self {
                    $(
                        $enum_name::$variant_name(rule) => rule.apply(ctx, plan),
                    )+
                    $enum_name::Custom(rule) => rule.apply(ctx, plan),
                }
            }

            pub fn matches(&self, plan: &ExecutionPlan) -> bool {
                self.pattern().matches(plan)
            }
        }

        impl RewriteRuleTrait for $enum_name {
            fn name(&self) -> &'static str {
                self.name()
            }

            fn pattern(&self) -> Pattern {
                self.pattern()
            }

            fn apply(
                &self,
                ctx: &mut RewriteContext,
                plan: &ExecutionPlan,
            ) -> RewriteResult<TransformResult> {
                self.apply(ctx, plan)
            }
        }
    };
}

define_rewrite_rules! {
    pub enum RewriteRule {
        // ==================== 条件归一化 ====================
        SimplifyConditions(normalization::SimplifyConditionsRule),
        SplitFilters(normalization::SplitFiltersRule),
        ReplaceOrWithIn(normalization::ReplaceOrWithInRule),
        RemoveRedundantOr(normalization::RemoveRedundantOrRule),

        // ==================== 消除规则 ====================
        RemoveUnnecessaryFilters(elimination::RemoveUnnecessaryFiltersRule),
        RemoveRedundantCalculations(elimination::RemoveRedundantCalculationsRule),
        RemoveUnnecessaryCalculations(elimination::RemoveUnnecessaryCalculationsRule),
        RemoveRedundantSorts(elimination::RemoveRedundantSortsRule),
        RemoveSortRand(elimination::RemoveSortRandRule),
        RemoveFilterCoveredByIndex(elimination::RemoveFilterCoveredByIndexRule),

        // ==================== 移动规则 ====================
        MoveCalculationsUp(movement::MoveCalculationsUpRule),
        MoveFiltersUp(movement::MoveFiltersUpRule),
        MoveCalculationsDown(movement::MoveCalculationsDownRule),

        // ==================== 循环重排 ====================
        InterchangeAdjacentEnumerations(permutation::InterchangeAdjacentEnumerationsRule),

        // ==================== 索引规则 ====================
        UseIndexes(index::UseIndexesRule),
        UseIndexForSort(index::UseIndexForSortRule),

        // ==================== 集群规则 ====================
        ScatterInCluster(cluster::ScatterInClusterRule),
        DistributeFilterCalcToCluster(cluster::DistributeFilterCalcToClusterRule),
        DistributeSortToCluster(cluster::DistributeSortToClusterRule),
        RemoveUnnecessaryRemoteScatter(cluster::RemoveUnnecessaryRemoteScatterRule),
    }
}

/// 规则所在的 pass，按数值升序执行
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RulePass {
    Normalize = 1,
    Early = 2,
    Permutation = 3,
    Index = 4,
    Late = 5,
    Cluster = 6,
}

impl RulePass {
    pub fn name(&self) -> &'static str {
        match self {
            RulePass::Normalize => "normalize",
            RulePass::Early => "early",
            RulePass::Permutation => "permutation",
            RulePass::Index => "index",
            RulePass::Late => "late",
            RulePass::Cluster => "cluster",
        }
    }
}

impl fmt::Display for RulePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 规则改动计划之后从哪里重新开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RerunPolicy {
    /// 重跑规则所在的 pass
    #[default]
    SamePass,
    /// 从指定 pass 开始重跑
    Pass(RulePass),
}

/// 注册表中的一条规则
#[derive(Debug)]
pub struct RuleDefinition {
    pub rule: RewriteRule,
    pub pass: RulePass,
    pub default_enabled: bool,
    pub cluster_only: bool,
    pub rerun: RerunPolicy,
}

impl RuleDefinition {
    pub fn new(rule: RewriteRule, pass: RulePass, default_enabled: bool) -> Self {
        Self {
            rule,
            pass,
            default_enabled,
            cluster_only: false,
            rerun: RerunPolicy::SamePass,
        }
    }

    pub fn cluster_only(mut self) -> Self {
        self.cluster_only = true;
        self
    }

    pub fn with_rerun(mut self, rerun: RerunPolicy) -> Self {
        self.rerun = rerun;
        self
    }

    pub fn name(&self) -> &'static str {
        self.rule.name()
    }

    /// 改动后重跑的 pass
    pub fn rerun_pass(&self) -> RulePass {
        match self.rerun {
            RerunPolicy::SamePass => self.pass,
            RerunPolicy::Pass(pass) => pass,
        }
    }

    /// 当前运行模式下能否执行
    pub fn can_run(&self, cluster: bool) -> bool {
        !self.cluster_only || cluster
    }
}

/// 规则注册表
#[derive(Debug)]
pub struct RuleRegistry {
    rules: Vec<RuleDefinition>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 注册规则，名称重复时返回 `DuplicateRuleName`
    pub fn register(&mut self, rule: RewriteRule, pass: RulePass, default_enabled: bool) -> OptimizeResult<()> {
        self.register_definition(RuleDefinition::new(rule, pass, default_enabled))
    }

    /// 注册只在集群模式下运行的规则
    pub fn register_cluster_rule(&mut self, rule: RewriteRule, default_enabled: bool) -> OptimizeResult<()> {
        self.register_definition(RuleDefinition::new(rule, RulePass::Cluster, default_enabled).cluster_only())
    }

    /// 注册外部实现的规则
    pub fn register_custom<R>(&mut self, rule: R, pass: RulePass, default_enabled: bool) -> OptimizeResult<()>
    where
        R: RewriteRuleTrait + 'static,
    {
        self.register(RewriteRule::Custom(Box::new(rule)), pass, default_enabled)
    }

    pub fn register_definition(&mut self, definition: RuleDefinition) -> OptimizeResult<()> {
        if self.position(definition.name()).is_some() {
            return Err(OptimizeError::DuplicateRuleName(definition.name().to_string()));
        }
        self.push(definition);
        Ok(())
    }

    /// 按 pass 插入，同一 pass 内保持注册顺序
    fn push(&mut self, definition: RuleDefinition) {
        let at = self
            .rules
            .iter()
            .position(|d| d.pass > definition.pass)
            .unwrap_or(self.rules.len());
        self.rules.insert(at, definition);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter()
    }

    pub fn get(&self, index: usize) -> Option<&RuleDefinition> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 规则在注册表中的位置，即启用位图的下标
    pub fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|d| d.name() == name)
    }

    pub fn find(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.iter().find(|d| d.name() == name)
    }

    /// 第一个属于 `pass` 或更靠后 pass 的规则位置
    pub fn pass_start(&self, pass: RulePass) -> usize {
        self.rules
            .iter()
            .position(|d| d.pass >= pass)
            .unwrap_or(self.rules.len())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|d| d.name()).collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        use RulePass::*;

        let mut registry = Self::new();
        let mut add = |rule: RewriteRule, pass: RulePass| {
            registry.push(RuleDefinition::new(rule, pass, true));
        };

        add(RewriteRule::SimplifyConditions(normalization::SimplifyConditionsRule::new()), Normalize);
        add(RewriteRule::SplitFilters(normalization::SplitFiltersRule::new()), Normalize);
        add(RewriteRule::ReplaceOrWithIn(normalization::ReplaceOrWithInRule::new()), Normalize);
        add(RewriteRule::RemoveRedundantOr(normalization::RemoveRedundantOrRule::new()), Normalize);

        add(RewriteRule::RemoveUnnecessaryFilters(elimination::RemoveUnnecessaryFiltersRule::new()), Early);
        add(RewriteRule::RemoveRedundantCalculations(elimination::RemoveRedundantCalculationsRule::new()), Early);
        add(RewriteRule::RemoveUnnecessaryCalculations(elimination::RemoveUnnecessaryCalculationsRule::new()), Early);
        add(RewriteRule::MoveCalculationsUp(movement::MoveCalculationsUpRule::new()), Early);
        add(RewriteRule::MoveFiltersUp(movement::MoveFiltersUpRule::new()), Early);
        add(RewriteRule::RemoveRedundantSorts(elimination::RemoveRedundantSortsRule::new()), Early);
        add(RewriteRule::RemoveSortRand(elimination::RemoveSortRandRule::new()), Early);

        add(RewriteRule::InterchangeAdjacentEnumerations(permutation::InterchangeAdjacentEnumerationsRule::new()), Permutation);

        add(RewriteRule::UseIndexes(index::UseIndexesRule::new()), Index);
        add(RewriteRule::RemoveFilterCoveredByIndex(elimination::RemoveFilterCoveredByIndexRule::new()), Index);
        add(RewriteRule::UseIndexForSort(index::UseIndexForSortRule::new()), Index);

        add(RewriteRule::MoveCalculationsDown(movement::MoveCalculationsDownRule::new()), Late);
        add(RewriteRule::RemoveUnnecessaryCalculations(elimination::RemoveUnnecessaryCalculationsRule::late()), Late);

        let cluster_rules = [
            RewriteRule::ScatterInCluster(cluster::ScatterInClusterRule::new()),
            RewriteRule::DistributeFilterCalcToCluster(cluster::DistributeFilterCalcToClusterRule::new()),
            RewriteRule::DistributeSortToCluster(cluster::DistributeSortToClusterRule::new()),
            RewriteRule::RemoveUnnecessaryRemoteScatter(cluster::RemoveUnnecessaryRemoteScatterRule::new()),
        ];
        for rule in cluster_rules {
            registry.push(RuleDefinition::new(rule, Cluster, true).cluster_only());
        }
        registry
    }
}
