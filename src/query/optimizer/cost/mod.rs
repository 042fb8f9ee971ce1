//! 代价计算模块
//!
//! 提供查询优化器在候选计划之间做选择所需的代价估算
//!
//! ## 模块结构
//!
//! - `config` - 代价模型配置
//! - `estimate` - 节点与计划的代价估算结果
//! - `selectivity` - 选择性估计器，估算过滤与索引条件的选择性
//! - `assigner` - 代价赋值器，为执行计划节点计算代价
//! - `selector` - 计划选择器，按代价挑选候选计划

pub mod assigner;
pub mod config;
pub mod estimate;
pub mod selectivity;
pub mod selector;

pub use assigner::CostAssigner;
pub use config::CostModelConfig;
pub use estimate::{NodeCostEstimate, PlanCost};
pub use selectivity::SelectivityEstimator;
pub use selector::{CandidateSummary, PlanSelector};
