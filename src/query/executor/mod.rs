//! 查询执行器
//!
//! 把执行计划转成拉取式执行块树并按批次产出结果。
//!
//! - `context`：执行上下文，按变量编号存放的行寄存器
//! - `blocks`：各节点类型的执行块
//! - `factory`：从计划构建执行块树
//! - `cursor`：分批读取结果，检查终止标记
//! - `stats`：执行统计

pub mod blocks;
pub mod context;
pub mod cursor;
pub mod factory;
pub mod stats;

pub use blocks::ExecutionBlock;
pub use context::{ExecutionContext, Row};
pub use cursor::QueryCursor;
pub use factory::BlockFactory;
pub use stats::ExecutionStats;
