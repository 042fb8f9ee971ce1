//! 计划重写模块
//!
//! 规则按 pass 分组，由 `PlanRewriter` 按注册表顺序驱动到不动点。
//!
//! # 模块结构
//!
//! - `context`: 重写上下文（存储协作方、集群模式、警告）
//! - `pattern`: 规则适用性预检
//! - `result`: 重写结果与错误
//! - `rule`: 重写规则 trait
//! - `rule_enum`: 内置规则枚举与注册表
//! - `rule_filter`: `optimizer.rules` 过滤器
//! - `plan_rewriter`: pass 调度与候选计划管理
//! - `macros`: 定义规则结构体的宏
//! - `plan_utils` / `expression_utils`: 规则共用的计划与表达式工具
//!
//! # 规则分类
//!
//! | pass | 模块 | 规则 |
//! |------|------|------|
//! | Normalize | `normalization` | simplify-conditions, split-filters, replace-or-with-in, remove-redundant-or |
//! | Early | `elimination`, `movement` | remove-unnecessary-filters, remove-redundant-calculations, remove-unnecessary-calculations, move-calculations-up, move-filters-up, remove-redundant-sorts, remove-sort-rand |
//! | Permutation | `permutation` | interchange-adjacent-enumerations |
//! | Index | `index`, `elimination` | use-indexes, remove-filter-covered-by-index, use-index-for-sort |
//! | Late | `movement`, `elimination` | move-calculations-down, remove-unnecessary-calculations-2 |
//! | Cluster | `cluster` | scatter-in-cluster, distribute-filtercalc-to-cluster, distribute-sort-to-cluster, remove-unnecessary-remote-scatter |
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use aql_optimizer::core::types::expression::Expression;
//! use aql_optimizer::query::planner::plan::PlanBuilder;
//! use aql_optimizer::query::planner::rewrite::{PlanRewriter, RewriteContext, RuleRegistry, RuleSelection};
//!
//! let mut builder = PlanBuilder::new();
//! let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(3)), "i");
//! builder.return_(Expression::reference(i));
//! let plan = builder.build().unwrap();
//!
//! let registry = Arc::new(RuleRegistry::default());
//! let selection = RuleSelection::defaults(&registry);
//! let rewriter = PlanRewriter::new(registry);
//! let plans = rewriter.rewrite(&mut RewriteContext::new(), plan, &selection).unwrap();
//! assert!(!plans.is_empty());
//! ```

pub mod context;
pub mod pattern;
pub mod result;
pub mod rule;

pub mod macros;

pub mod expression_utils;
pub mod plan_utils;

pub mod plan_rewriter;
pub mod rule_enum;
pub mod rule_filter;

pub mod cluster;
pub mod elimination;
pub mod index;
pub mod movement;
pub mod normalization;
pub mod permutation;

pub use context::RewriteContext;
pub use pattern::{MatchNode, Pattern};
pub use plan_rewriter::{PlanRewriter, RewrittenPlan};
pub use result::{RewriteError, RewriteResult, TransformResult};
pub use rule::RewriteRule;
pub use rule_enum::{RerunPolicy, RuleDefinition, RulePass, RuleRegistry, RewriteRule as RewriteRuleEnum};
pub use rule_filter::{RuleFilter, RuleSelection};
