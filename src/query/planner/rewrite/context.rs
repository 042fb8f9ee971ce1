//! 重写上下文定义
//!
//! 一次优化调用内所有规则共享的状态：存储协作方（读取索引）、集群模式、
//! 索引描述符缓存和警告。上下文属于单次优化调用，不跨查询共享。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ClusterConfig;
use crate::core::{StorageResult, Warning, WarningCollector};
use crate::index::IndexDescriptor;
use crate::storage::StorageClient;

/// 重写上下文
pub struct RewriteContext {
    storage: Option<Arc<dyn StorageClient>>,
    cluster: ClusterConfig,
    index_cache: HashMap<String, Vec<IndexDescriptor>>,
    count_cache: HashMap<String, u64>,
    warnings: WarningCollector,
}

impl fmt::Debug for RewriteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewriteContext")
            .field("has_storage", &self.storage.is_some())
            .field("cluster", &self.cluster)
            .field("cached_collections", &self.index_cache.len())
            .finish()
    }
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteContext {
    /// 没有存储协作方的上下文，索引相关规则不会生效
    pub fn new() -> Self {
        Self {
            storage: None,
            cluster: ClusterConfig::single_server(),
            index_cache: HashMap::new(),
            count_cache: HashMap::new(),
            warnings: WarningCollector::default(),
        }
    }

    pub fn with_storage(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage: Some(storage),
            ..Self::new()
        }
    }

    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn is_cluster(&self) -> bool {
        self.cluster.enabled
    }

    pub fn storage(&self) -> Option<&Arc<dyn StorageClient>> {
        self.storage.as_ref()
    }

    /// 集合上的索引；没有存储协作方或集合不存在时为空
    pub fn indexes(&mut self, collection: &str) -> StorageResult<Vec<IndexDescriptor>> {
        if let Some(cached) = self.index_cache.get(collection) {
            return Ok(cached.clone());
        }
        let indexes = match &self.storage {
            Some(storage) if storage.collection_exists(collection) => {
                storage.get_indexes(collection)?
            }
            _ => Vec::new(),
        };
        self.index_cache
            .insert(collection.to_string(), indexes.clone());
        Ok(indexes)
    }

    /// 集合的文档数，未知时为 None
    pub fn collection_count(&mut self, collection: &str) -> Option<u64> {
        if let Some(count) = self.count_cache.get(collection) {
            return Some(*count);
        }
        let storage = self.storage.as_ref()?;
        let count = storage.collection_count(collection).ok()?;
        self.count_cache.insert(collection.to_string(), count);
        Some(count)
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        self.warnings.as_slice()
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings).into_vec()
    }
}
