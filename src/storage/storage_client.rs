//! 存储协作方接口
//!
//! 优化规则通过 `get_indexes` 读取索引描述符，执行器通过扫描与写事务访问数据。
//! 所有错误都以 `StorageError` 返回，数值错误码原样传给调用方。

use std::fmt;

use crate::core::{StorageResult, Value};
use crate::index::{IndexDescriptor, IndexLookup, IndexOptions};
use crate::storage::types::{Direction, ShardSpec};

pub trait StorageClient: Send + Sync + fmt::Debug {
    fn collection_exists(&self, collection: &str) -> bool;
    fn collection_count(&self, collection: &str) -> StorageResult<u64>;

    fn get_indexes(&self, collection: &str) -> StorageResult<Vec<IndexDescriptor>>;
    fn ensure_index(&self, collection: &str, options: IndexOptions) -> StorageResult<IndexDescriptor>;
    fn drop_index(&self, index_id: &str) -> StorageResult<()>;

    /// 全集合扫描，按文档键顺序
    fn scan_full(&self, collection: &str, shard: Option<ShardSpec>) -> StorageResult<Vec<Value>>;

    /// 索引扫描，按索引键顺序（`reverse` 时倒序）返回满足查找条件的文档
    fn scan_index(
        &self,
        index_id: &str,
        lookup: &IndexLookup,
        reverse: bool,
        shard: Option<ShardSpec>,
    ) -> StorageResult<Vec<Value>>;

    fn document(&self, collection: &str, key: &str) -> StorageResult<Option<Value>>;

    /// 顶点 `vertex_id`（形如 `collection/key`）在边集合中的边
    fn edges(&self, collection: &str, vertex_id: &str, direction: Direction) -> StorageResult<Vec<Value>>;

    /// 打开写事务，提交前的修改对其他读取不可见
    fn begin_write(&self) -> StorageResult<Box<dyn WriteTransaction + '_>>;
}

/// 写事务，未提交即丢弃时回滚
pub trait WriteTransaction {
    /// 插入文档，返回补全 `_key`/`_id`/`_rev` 后的新文档
    fn insert(&mut self, collection: &str, document: Value) -> StorageResult<Value>;

    /// 合并更新，返回 (旧文档, 新文档)
    fn update(&mut self, collection: &str, key: &str, patch: Value) -> StorageResult<(Value, Value)>;

    /// 整体替换，返回 (旧文档, 新文档)
    fn replace(&mut self, collection: &str, key: &str, document: Value) -> StorageResult<(Value, Value)>;

    /// 删除文档，返回旧文档
    fn remove(&mut self, collection: &str, key: &str) -> StorageResult<Value>;

    /// 在事务视图中查找第一个与样例属性全部相等的文档
    fn find_by_example(&self, collection: &str, example: &Value) -> StorageResult<Option<Value>>;

    fn commit(self: Box<Self>) -> StorageResult<()>;
}
