//! 查询处理
//!
//! - `planner`：执行计划模型与重写规则
//! - `optimizer`：规则调度、代价估算与计划选择
//! - `executor`：拉取式执行块与游标
//! - `query_manager`：运行中查询的登记与终止
//! - `query_engine`：explain / execute 入口

pub mod executor;
pub mod optimizer;
pub mod planner;
pub mod query_engine;
pub mod query_manager;

pub use crate::core::{QueryError, QueryResult};
pub use query_engine::{ExecuteResult, ExplainResult, PreparedQuery, QueryEngine, QueryProfile};
pub use query_manager::{QueryGuard, QueryInfo, QueryManager, QueryStats, QueryStatus};
