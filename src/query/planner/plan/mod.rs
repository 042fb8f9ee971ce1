//! 执行计划模型
//!
//! - 节点类型 (`node.rs`)
//! - arena 形式的计划图与结构修改 (`execution_plan.rs`)
//! - 遍历器 (`walker.rs`)
//! - 初始计划构建 (`builder.rs`)
//! - explain 输出 (`explain.rs`)

pub mod builder;
pub mod execution_plan;
pub mod explain;
pub mod node;
pub mod walker;

pub use builder::{CollectVariables, ModificationVariables, PlanBuilder, TraversalVariables};
pub use execution_plan::ExecutionPlan;
pub use explain::{describe, PlanDescription, PlanNodeDescription};
pub use node::{
    AggregateFunction, CollectAggregate, CollectGroup, CollectInto, ModificationOptions, PlanNode,
    PlanNodeKind, PlanNodeType, SortElement, SortPath,
};
pub use walker::{PlanWalker, WalkOrder};
