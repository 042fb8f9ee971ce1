//! 查询优化器模块
//!
//! 在计划重写的基础上完成一次完整的优化：规则筛选、候选计划生成、代价估算与计划选择
//!
//! ## 模块结构
//!
//! - `cost` - 代价计算模块，估算候选计划的代价并选出最优计划
//! - `options` - 单次查询的选项（规则开关、allPlans 等）
//! - `optimizer` - 优化器入口
//!
//! ## 使用示例
//!
//! ```rust
//! use aql_optimizer::core::types::expression::Expression;
//! use aql_optimizer::query::optimizer::{Optimizer, QueryOptions};
//! use aql_optimizer::query::planner::plan::PlanBuilder;
//! use aql_optimizer::query::planner::rewrite::RewriteContext;
//!
//! let mut builder = PlanBuilder::new();
//! let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(10)), "i");
//! builder.filter(Expression::gt(Expression::reference(i), Expression::literal(5)));
//! builder.return_(Expression::reference(i));
//! let plan = builder.build().unwrap();
//!
//! let optimizer = Optimizer::default();
//! let result = optimizer
//!     .optimize(&mut RewriteContext::new(), plan, &QueryOptions::default())
//!     .unwrap();
//! assert!(result.best().is_some());
//! ```

pub mod cost;
pub mod optimizer;
pub mod options;

pub use cost::{
    CostAssigner, CostModelConfig, NodeCostEstimate, PlanCost, PlanSelector, SelectivityEstimator,
};
pub use optimizer::{CandidatePlan, Optimizer, OptimizerResult};
pub use options::{OptimizerOptions, QueryOptions};
