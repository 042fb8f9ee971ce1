//! 索引模块
//!
//! - 索引描述符与创建选项 (`types.rs`)
//! - IndexNode 的查找条件 (`condition.rs`)
//!
//! 索引存储实现位于 `storage::memory_storage`。

pub mod condition;
pub mod types;

pub use condition::{IndexClause, IndexCondition, IndexLookup, LookupClause};
pub use types::{IndexDescriptor, IndexOptions, IndexType};
