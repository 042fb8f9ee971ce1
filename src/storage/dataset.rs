//! 数据集描述
//!
//! 命令行工具与测试用 JSON 描述初始数据：
//!
//! ```json
//! {
//!   "collections": {
//!     "users": {
//!       "type": "document",
//!       "documents": [{"_key": "a", "age": 3}],
//!       "indexes": [{"type": "persistent", "fields": ["age"]}]
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::memory_storage::MemoryStorage;
use super::storage_client::StorageClient;
use super::types::CollectionType;
use crate::core::{StorageResult, Value};
use crate::index::IndexOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSpec {
    #[serde(default, rename = "type")]
    pub collection_type: CollectionType,
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub indexes: Vec<IndexOptions>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionSpec>,
}

impl Dataset {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// 建立内存存储并装载全部集合、文档与索引
    pub fn into_storage(self, lock_timeout: Duration) -> StorageResult<MemoryStorage> {
        let storage = MemoryStorage::with_lock_timeout(lock_timeout);
        for (name, spec) in self.collections {
            storage.create_collection(&name, spec.collection_type)?;
            storage.insert_documents(&name, spec.documents)?;
            for options in spec.indexes {
                storage.ensure_index(&name, options)?;
            }
        }
        Ok(storage)
    }
}
