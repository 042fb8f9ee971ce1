//! 表达式模块
//!
//! - `functions`：函数注册表与内置函数
//! - `evaluator`：按 AQL 语义求值表达式
//! - `context`：求值上下文
//! - `condition`：过滤条件归一化

pub mod condition;
pub mod context;
pub mod evaluator;
pub mod functions;

pub use crate::core::error::{ExpressionError, ExpressionErrorType};

pub use context::{EmptyContext, MapContext};
pub use evaluator::{ExpressionContext, ExpressionEvaluator};
