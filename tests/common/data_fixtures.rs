//! 测试数据生成器
//!
//! 集合内容固定，便于断言结果行数

use std::sync::Arc;

use serde_json::json;

use aql_optimizer::index::IndexOptions;
use aql_optimizer::storage::{CollectionType, MemoryStorage, StorageClient};

/// 文档数
pub const DOCUMENTS: usize = 100;

/// `c`: 100 个文档，`value = i % 10`，`group = i % 4`，`value` 上有持久化索引，
/// `group` 上有哈希索引；`d`: 5 个没有索引的文档
pub fn standard_storage() -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    storage.create_collection("c", CollectionType::Document).unwrap();
    let docs = (0..DOCUMENTS)
        .map(|i| {
            json!({
                "_key": format!("k{:03}", i),
                "value": i % 10,
                "group": i % 4,
                "name": format!("name{}", i),
            })
        })
        .collect();
    storage.insert_documents("c", docs).unwrap();
    storage.ensure_index("c", IndexOptions::persistent(&["value"])).unwrap();
    storage.ensure_index("c", IndexOptions::hash(&["group"])).unwrap();

    storage.create_collection("d", CollectionType::Document).unwrap();
    let docs = (0..5).map(|i| json!({"_key": format!("d{}", i), "ref": i})).collect();
    storage.insert_documents("d", docs).unwrap();
    Arc::new(storage)
}

/// `sorted`: `unique` 个值各插入 `copies` 次，`value` 上有持久化索引
pub fn sorted_storage(unique: usize, copies: usize) -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    storage.create_collection("sorted", CollectionType::Document).unwrap();
    for copy in 0..copies {
        let docs = (0..unique)
            .map(|i| json!({"_key": format!("s{}_{}", copy, i), "value": i}))
            .collect();
        storage.insert_documents("sorted", docs).unwrap();
    }
    storage
        .ensure_index("sorted", IndexOptions::persistent(&["value"]))
        .unwrap();
    Arc::new(storage)
}

/// 顶点集合 `v` (a, b, c, d) 与边集合 `e`: a→b, b→c, c→d, a→c
pub fn graph_storage() -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    storage.create_collection("v", CollectionType::Document).unwrap();
    storage.create_collection("e", CollectionType::Edge).unwrap();
    for key in ["a", "b", "c", "d"] {
        storage.insert_document("v", json!({"_key": key})).unwrap();
    }
    for (from, to) in [("a", "b"), ("b", "c"), ("c", "d"), ("a", "c")] {
        storage
            .insert_document("e", json!({"_from": format!("v/{}", from), "_to": format!("v/{}", to)}))
            .unwrap();
    }
    Arc::new(storage)
}
