//! 统一错误处理
//!
//! ## 设计理念
//!
//! 1. **按层划分**：计划图、优化器、表达式、存储各自一个错误枚举
//! 2. **汇聚转换**：`QueryError` 通过 `#[from]` 汇聚下层错误，保留完整错误链
//! 3. **稳定错误码**：每个错误都能映射到 `ErrorCode`，调用方按 `errorNum` 判断

pub mod codes;
pub mod expression;
pub mod optimize;
pub mod plan;
pub mod query;
pub mod storage;

pub use codes::{ErrorCategory, ErrorCode, PublicError, ToPublicError};
pub use expression::{ExpressionError, ExpressionErrorType};
pub use optimize::{CostError, CostResult, OptimizeError, OptimizeResult};
pub use plan::{PlanError, PlanResult};
pub use query::{QueryError, QueryResult};
pub use storage::{StorageError, StorageResult};
