pub mod error;
pub mod types;
pub mod value;
pub mod warning;

// 错误和结果类型
pub use error::{
    ErrorCode, ExpressionError, OptimizeError, PlanError, QueryError, QueryResult, StorageError,
    StorageResult, ToPublicError,
};

// 核心数据类型
pub use types::{Expression, NodeId, Variable, VariableId, VariableRegistry};
pub use value::Value;
pub use warning::{Warning, WarningCollector};
