//! 内存存储实现
//!
//! 集合以 `Arc<CollectionData>` 保存，写事务对涉及的集合做写时复制，
//! 提交时检查版本号，与并发提交冲突则中止。读写锁使用带超时的
//! `try_read_for` / `try_write_for`，超时返回 `LockTimeout`。

use log::debug;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;

use super::storage_client::{StorageClient, WriteTransaction};
use super::types::{CollectionType, Direction, ShardSpec};
use crate::core::value::{get_path, ValueKey};
use crate::core::{StorageError, StorageResult, Value};
use crate::index::{IndexDescriptor, IndexLookup, IndexOptions, IndexType};

/// 默认锁等待时间
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
struct MemoryIndex {
    descriptor: IndexDescriptor,
    paths: Vec<Vec<String>>,
    entries: BTreeSet<(ValueKey, String)>,
}

impl MemoryIndex {
    fn new(descriptor: IndexDescriptor) -> Self {
        let paths = descriptor.field_paths();
        Self {
            descriptor,
            paths,
            entries: BTreeSet::new(),
        }
    }

    /// 文档在索引中的键；稀疏索引不收录含 null 的文档
    fn key_of(&self, document: &Value) -> Option<ValueKey> {
        let values: Vec<Value> = self.paths.iter().map(|p| get_path(document, p)).collect();
        if self.descriptor.sparse && values.iter().any(Value::is_null) {
            return None;
        }
        Some(ValueKey(values))
    }

    fn check_unique(&self, doc_key: &str, document: &Value) -> StorageResult<()> {
        if !self.descriptor.unique {
            return Ok(());
        }
        let Some(key) = self.key_of(document) else {
            return Ok(());
        };
        let start = (key.clone(), String::new());
        let conflict = self
            .entries
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(k, _)| *k == key)
            .any(|(_, owner)| owner != doc_key);
        if conflict {
            return Err(StorageError::UniqueConstraintViolated {
                index: self.descriptor.id.clone(),
                key: serde_json::to_string(&key.0).unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, doc_key: &str, document: &Value) {
        if let Some(key) = self.key_of(document) {
            self.entries.insert((key, doc_key.to_string()));
        }
    }

    fn remove(&mut self, doc_key: &str, document: &Value) {
        if let Some(key) = self.key_of(document) {
            self.entries.remove(&(key, doc_key.to_string()));
        }
    }

    fn selectivity(&self) -> f64 {
        if self.descriptor.unique || self.entries.is_empty() {
            return 1.0;
        }
        let mut distinct = 0usize;
        let mut previous: Option<&ValueKey> = None;
        for (key, _) in &self.entries {
            if previous != Some(key) {
                distinct += 1;
                previous = Some(key);
            }
        }
        distinct as f64 / self.entries.len() as f64
    }
}

#[derive(Debug, Clone)]
struct CollectionData {
    name: String,
    collection_type: CollectionType,
    documents: BTreeMap<String, Value>,
    indexes: Vec<MemoryIndex>,
    next_key: u64,
    next_index_id: u64,
    next_rev: u64,
    version: u64,
}

impl CollectionData {
    fn new(name: &str, collection_type: CollectionType) -> Self {
        let mut indexes = Vec::new();
        if collection_type == CollectionType::Edge {
            indexes.push(MemoryIndex::new(IndexDescriptor::edge(name)));
        }
        Self {
            name: name.to_string(),
            collection_type,
            documents: BTreeMap::new(),
            indexes,
            next_key: 1,
            next_index_id: 2,
            next_rev: 1,
            version: 0,
        }
    }

    fn primary_descriptor(&self) -> IndexDescriptor {
        IndexDescriptor::primary(&self.name)
    }

    fn descriptors(&self) -> Vec<IndexDescriptor> {
        let mut result = vec![self.primary_descriptor()];
        for index in &self.indexes {
            let mut descriptor = index.descriptor.clone();
            descriptor.selectivity_estimate = index.selectivity();
            result.push(descriptor);
        }
        result
    }

    fn new_rev(&mut self) -> String {
        let rev = self.next_rev;
        self.next_rev += 1;
        format!("_r{}", rev)
    }

    fn check_indexes(&self, doc_key: &str, document: &Value) -> StorageResult<()> {
        for index in &self.indexes {
            index.check_unique(doc_key, document)?;
        }
        Ok(())
    }

    fn validate_document(&self, document: &Value) -> StorageResult<()> {
        let Value::Object(map) = document else {
            return Err(StorageError::DocumentTypeInvalid(format!(
                "集合 {} 只接受对象文档",
                self.name
            )));
        };
        if self.collection_type == CollectionType::Edge {
            let valid = |attr: &str| map.get(attr).map(Value::is_string).unwrap_or(false);
            if !valid("_from") || !valid("_to") {
                return Err(StorageError::DocumentTypeInvalid(format!(
                    "边集合 {} 的文档必须包含 _from 与 _to",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut document: Value) -> StorageResult<Value> {
        self.validate_document(&document)?;
        let key = match document.get("_key") {
            Some(Value::String(key)) => key.clone(),
            Some(_) => {
                return Err(StorageError::DocumentTypeInvalid("_key 必须是字符串".to_string()))
            }
            None => {
                let key = self.next_key.to_string();
                self.next_key += 1;
                key
            }
        };
        if self.documents.contains_key(&key) {
            return Err(StorageError::UniqueConstraintViolated {
                index: self.primary_descriptor().id,
                key,
            });
        }
        let rev = self.new_rev();
        if let Value::Object(map) = &mut document {
            map.insert("_key".to_string(), Value::String(key.clone()));
            map.insert("_id".to_string(), Value::String(format!("{}/{}", self.name, key)));
            map.insert("_rev".to_string(), Value::String(rev));
        }
        self.check_indexes(&key, &document)?;
        for index in &mut self.indexes {
            index.insert(&key, &document);
        }
        self.documents.insert(key, document.clone());
        Ok(document)
    }

    fn swap(&mut self, key: &str, mut document: Value) -> StorageResult<(Value, Value)> {
        let old = self
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound(format!("{}/{}", self.name, key)))?;
        let rev = self.new_rev();
        if let Value::Object(map) = &mut document {
            for system in ["_key", "_id"] {
                if let Some(value) = old.get(system) {
                    map.insert(system.to_string(), value.clone());
                }
            }
            map.insert("_rev".to_string(), Value::String(rev));
        }
        self.validate_document(&document)?;
        self.check_indexes(key, &document)?;
        for index in &mut self.indexes {
            index.remove(key, &old);
            index.insert(key, &document);
        }
        self.documents.insert(key.to_string(), document.clone());
        Ok((old, document))
    }

    fn update(&mut self, key: &str, patch: Value) -> StorageResult<(Value, Value)> {
        let Value::Object(patch) = patch else {
            return Err(StorageError::DocumentTypeInvalid("更新内容必须是对象".to_string()));
        };
        let mut merged = self
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::DocumentNotFound(format!("{}/{}", self.name, key)))?;
        if let Value::Object(map) = &mut merged {
            for (name, value) in patch {
                map.insert(name, value);
            }
        }
        self.swap(key, merged)
    }

    fn remove(&mut self, key: &str) -> StorageResult<Value> {
        let old = self
            .documents
            .remove(key)
            .ok_or_else(|| StorageError::DocumentNotFound(format!("{}/{}", self.name, key)))?;
        for index in &mut self.indexes {
            index.remove(key, &old);
        }
        Ok(old)
    }

    fn find_by_example(&self, example: &Value) -> Option<Value> {
        let Value::Object(example) = example else {
            return None;
        };
        self.documents
            .values()
            .find(|doc| {
                example
                    .iter()
                    .all(|(name, value)| doc.get(name) == Some(value))
            })
            .cloned()
    }
}

/// 存储状态，集合按名称保存
#[derive(Debug, Default)]
pub struct StorageState {
    collections: HashMap<String, Arc<CollectionData>>,
}

/// 测试用的独占锁，持有期间所有读写都会等待直到超时
pub struct ExclusiveLock<'a> {
    _guard: RwLockWriteGuard<'a, StorageState>,
}

/// 内存存储
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    state: Arc<RwLock<StorageState>>,
    lock_timeout: Duration,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(StorageState::default())),
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    fn read(&self) -> StorageResult<parking_lot::RwLockReadGuard<'_, StorageState>> {
        self.state.try_read_for(self.lock_timeout).ok_or_else(|| {
            StorageError::LockTimeout(format!("读锁等待超过 {:?}", self.lock_timeout))
        })
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, StorageState>> {
        self.state.try_write_for(self.lock_timeout).ok_or_else(|| {
            StorageError::LockTimeout(format!("写锁等待超过 {:?}", self.lock_timeout))
        })
    }

    fn collection(&self, name: &str) -> StorageResult<Arc<CollectionData>> {
        self.read()?
            .collections
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::CollectionNotFound(name.to_string()))
    }

    /// 独占整个存储，直到返回值被释放
    pub fn exclusive_lock(&self) -> ExclusiveLock<'_> {
        ExclusiveLock {
            _guard: self.state.write(),
        }
    }

    pub fn create_collection(&self, name: &str, collection_type: CollectionType) -> StorageResult<()> {
        let mut state = self.write()?;
        if state.collections.contains_key(name) {
            return Err(StorageError::CollectionAlreadyExists(name.to_string()));
        }
        state
            .collections
            .insert(name.to_string(), Arc::new(CollectionData::new(name, collection_type)));
        debug!("Created {:?} collection '{}'", collection_type, name);
        Ok(())
    }

    pub fn drop_collection(&self, name: &str) -> StorageResult<()> {
        self.write()?
            .collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::CollectionNotFound(name.to_string()))
    }

    pub fn collection_names(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.read()?.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// 在独立事务中插入一批文档
    pub fn insert_documents(&self, collection: &str, documents: Vec<Value>) -> StorageResult<Vec<Value>> {
        let mut trx = self.begin_write()?;
        let mut inserted = Vec::with_capacity(documents.len());
        for document in documents {
            inserted.push(trx.insert(collection, document)?);
        }
        trx.commit()?;
        Ok(inserted)
    }

    pub fn insert_document(&self, collection: &str, document: Value) -> StorageResult<Value> {
        let mut inserted = self.insert_documents(collection, vec![document])?;
        inserted
            .pop()
            .ok_or_else(|| StorageError::InvalidInput("插入结果为空".to_string()))
    }

    fn find_index<'c>(
        collections: &'c HashMap<String, Arc<CollectionData>>,
        index_id: &str,
    ) -> StorageResult<(&'c CollectionData, Option<&'c MemoryIndex>)> {
        let not_found = || StorageError::IndexNotFound(index_id.to_string());
        let (collection, _) = index_id.rsplit_once('/').ok_or_else(not_found)?;
        let data = collections.get(collection).ok_or_else(not_found)?;
        if data.primary_descriptor().id == index_id {
            return Ok((data, None));
        }
        let index = data
            .indexes
            .iter()
            .find(|i| i.descriptor.id == index_id)
            .ok_or_else(not_found)?;
        Ok((data, Some(index)))
    }
}

impl StorageClient for MemoryStorage {
    fn collection_exists(&self, collection: &str) -> bool {
        self.read()
            .map(|state| state.collections.contains_key(collection))
            .unwrap_or(false)
    }

    fn collection_count(&self, collection: &str) -> StorageResult<u64> {
        Ok(self.collection(collection)?.documents.len() as u64)
    }

    fn get_indexes(&self, collection: &str) -> StorageResult<Vec<IndexDescriptor>> {
        Ok(self.collection(collection)?.descriptors())
    }

    fn ensure_index(&self, collection: &str, options: IndexOptions) -> StorageResult<IndexDescriptor> {
        if options.fields.is_empty() {
            return Err(StorageError::InvalidInput("索引至少需要一个字段".to_string()));
        }
        let mut state = self.write()?;
        let entry = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;

        let existing = entry.descriptors().into_iter().find(|d| {
            d.index_type == options.index_type
                && d.fields == options.fields
                && d.unique == options.unique
                && d.sparse == options.sparse
        });
        if let Some(descriptor) = existing {
            return Ok(descriptor);
        }
        if matches!(options.index_type, IndexType::Primary | IndexType::Edge) {
            return Err(StorageError::InvalidInput(format!(
                "不能创建 {} 类型的索引",
                options.index_type.name()
            )));
        }

        let data = Arc::make_mut(entry);
        let mut descriptor = IndexDescriptor::new(
            format!("{}/{}", collection, data.next_index_id),
            collection,
            options.index_type,
            options.fields,
        );
        descriptor.unique = options.unique;
        descriptor.sparse = options.sparse;
        descriptor.cache_enabled = options.cache_enabled;

        let mut index = MemoryIndex::new(descriptor);
        for (key, document) in &data.documents {
            index.check_unique(key, document)?;
            index.insert(key, document);
        }
        data.next_index_id += 1;
        data.version += 1;
        let mut descriptor = index.descriptor.clone();
        descriptor.selectivity_estimate = index.selectivity();
        data.indexes.push(index);
        debug!("Created index {} on {:?}", descriptor.id, descriptor.fields);
        Ok(descriptor)
    }

    fn drop_index(&self, index_id: &str) -> StorageResult<()> {
        let mut state = self.write()?;
        let not_found = || StorageError::IndexNotFound(index_id.to_string());
        let (collection, _) = index_id.rsplit_once('/').ok_or_else(not_found)?;
        let entry = state.collections.get_mut(collection).ok_or_else(not_found)?;
        let position = entry
            .indexes
            .iter()
            .position(|i| i.descriptor.id == index_id && i.descriptor.index_type != IndexType::Edge)
            .ok_or_else(not_found)?;
        let data = Arc::make_mut(entry);
        data.indexes.remove(position);
        data.version += 1;
        Ok(())
    }

    fn scan_full(&self, collection: &str, shard: Option<ShardSpec>) -> StorageResult<Vec<Value>> {
        let data = self.collection(collection)?;
        Ok(data
            .documents
            .iter()
            .filter(|(key, _)| shard.map(|s| s.contains(key)).unwrap_or(true))
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    fn scan_index(
        &self,
        index_id: &str,
        lookup: &IndexLookup,
        reverse: bool,
        shard: Option<ShardSpec>,
    ) -> StorageResult<Vec<Value>> {
        let state = self.read()?;
        let (data, index) = Self::find_index(&state.collections, index_id)?;
        let in_shard = |key: &str| shard.map(|s| s.contains(key)).unwrap_or(true);

        let keys: Box<dyn Iterator<Item = &String> + '_> = match index {
            None => {
                if reverse {
                    Box::new(data.documents.keys().rev())
                } else {
                    Box::new(data.documents.keys())
                }
            }
            Some(index) => {
                if reverse {
                    Box::new(index.entries.iter().rev().map(|(_, key)| key))
                } else {
                    Box::new(index.entries.iter().map(|(_, key)| key))
                }
            }
        };

        Ok(keys
            .filter(|key| in_shard(key))
            .filter_map(|key| data.documents.get(key))
            .filter(|doc| lookup.matches(doc))
            .cloned()
            .collect())
    }

    fn document(&self, collection: &str, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.collection(collection)?.documents.get(key).cloned())
    }

    fn edges(&self, collection: &str, vertex_id: &str, direction: Direction) -> StorageResult<Vec<Value>> {
        let data = self.collection(collection)?;
        if data.collection_type != CollectionType::Edge {
            return Err(StorageError::DocumentTypeInvalid(format!(
                "{} 不是边集合",
                collection
            )));
        }
        let is_vertex = |doc: &Value, attr: &str| doc.get(attr).and_then(Value::as_str) == Some(vertex_id);
        Ok(data
            .documents
            .values()
            .filter(|doc| match direction {
                Direction::Outbound => is_vertex(doc, "_from"),
                Direction::Inbound => is_vertex(doc, "_to"),
                Direction::Any => is_vertex(doc, "_from") || is_vertex(doc, "_to"),
            })
            .cloned()
            .collect())
    }

    fn begin_write(&self) -> StorageResult<Box<dyn WriteTransaction + '_>> {
        let snapshot = self.read()?.collections.clone();
        Ok(Box::new(MemoryTransaction {
            storage: self,
            snapshot,
            working: HashMap::new(),
            committed: false,
        }))
    }
}

/// 内存写事务
///
/// 开始时记录各集合的快照，第一次写某个集合时复制一份工作副本。
struct MemoryTransaction<'a> {
    storage: &'a MemoryStorage,
    snapshot: HashMap<String, Arc<CollectionData>>,
    working: HashMap<String, CollectionData>,
    committed: bool,
}

impl MemoryTransaction<'_> {
    fn working_copy(&mut self, collection: &str) -> StorageResult<&mut CollectionData> {
        if !self.working.contains_key(collection) {
            let base = self
                .snapshot
                .get(collection)
                .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;
            self.working
                .insert(collection.to_string(), CollectionData::clone(base));
        }
        self.working
            .get_mut(collection)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))
    }
}

impl WriteTransaction for MemoryTransaction<'_> {
    fn insert(&mut self, collection: &str, document: Value) -> StorageResult<Value> {
        self.working_copy(collection)?.insert(document)
    }

    fn update(&mut self, collection: &str, key: &str, patch: Value) -> StorageResult<(Value, Value)> {
        self.working_copy(collection)?.update(key, patch)
    }

    fn replace(&mut self, collection: &str, key: &str, document: Value) -> StorageResult<(Value, Value)> {
        self.working_copy(collection)?.swap(key, document)
    }

    fn remove(&mut self, collection: &str, key: &str) -> StorageResult<Value> {
        self.working_copy(collection)?.remove(key)
    }

    fn find_by_example(&self, collection: &str, example: &Value) -> StorageResult<Option<Value>> {
        if let Some(data) = self.working.get(collection) {
            return Ok(data.find_by_example(example));
        }
        let data = self
            .snapshot
            .get(collection)
            .ok_or_else(|| StorageError::CollectionNotFound(collection.to_string()))?;
        Ok(data.find_by_example(example))
    }

    fn commit(mut self: Box<Self>) -> StorageResult<()> {
        if self.working.is_empty() {
            self.committed = true;
            return Ok(());
        }
        let storage = self.storage;
        let mut state = storage.write()?;
        for (name, data) in &self.working {
            let current = state
                .collections
                .get(name)
                .ok_or_else(|| StorageError::TransactionAborted(format!("集合 {} 已被删除", name)))?;
            if current.version != data.version {
                return Err(StorageError::TransactionAborted(format!(
                    "集合 {} 在事务期间被修改",
                    name
                )));
            }
        }
        for (name, mut data) in std::mem::take(&mut self.working) {
            data.version += 1;
            state.collections.insert(name, Arc::new(data));
        }
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.working.is_empty() {
            debug!(
                "Rolling back write transaction on {} collection(s)",
                self.working.len()
            );
        }
    }
}
