//! 存储模块
//!
//! - `storage_client`：存储协作方接口与写事务接口
//! - `memory_storage`：内存实现，供测试与命令行工具使用
//! - `dataset`：JSON 数据集装载

pub mod dataset;
pub mod memory_storage;
pub mod storage_client;
pub mod types;

pub use dataset::{CollectionSpec, Dataset};
pub use memory_storage::{ExclusiveLock, MemoryStorage, DEFAULT_LOCK_TIMEOUT};
pub use storage_client::{StorageClient, WriteTransaction};
pub use types::{shard_of, CollectionType, Direction, ShardSpec};

pub use crate::core::StorageError;
