//! 索引类型定义模块
//!
//! 提供索引描述符与创建选项。描述符由存储层提供给优化规则使用，
//! 其中 `selectivity_estimate` 是索引中不同键的比例。

use serde::{Deserialize, Serialize};

/// 索引类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    Primary,
    Edge,
    Hash,
    Skiplist,
    Persistent,
    Geo,
    Fulltext,
    Ttl,
    Inverted,
}

impl IndexType {
    pub fn name(&self) -> &'static str {
        match self {
            IndexType::Primary => "primary",
            IndexType::Edge => "edge",
            IndexType::Hash => "hash",
            IndexType::Skiplist => "skiplist",
            IndexType::Persistent => "persistent",
            IndexType::Geo => "geo",
            IndexType::Fulltext => "fulltext",
            IndexType::Ttl => "ttl",
            IndexType::Inverted => "inverted",
        }
    }

    /// 按键有序迭代
    pub fn is_sorted(&self) -> bool {
        matches!(
            self,
            IndexType::Primary | IndexType::Skiplist | IndexType::Persistent
        )
    }

    /// 支持等值查找
    pub fn supports_equality(&self) -> bool {
        matches!(
            self,
            IndexType::Primary
                | IndexType::Edge
                | IndexType::Hash
                | IndexType::Skiplist
                | IndexType::Persistent
        )
    }

    /// 支持范围查找
    pub fn supports_range(&self) -> bool {
        self.is_sorted()
    }
}

/// 索引描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescriptor {
    /// 形如 `collection/id`
    pub id: String,
    pub collection: String,
    #[serde(rename = "type")]
    pub index_type: IndexType,
    /// 点分属性路径，例如 `address.city`
    pub fields: Vec<String>,
    pub unique: bool,
    pub sparse: bool,
    pub selectivity_estimate: f64,
    pub cache_enabled: bool,
}

impl IndexDescriptor {
    pub fn new(
        id: impl Into<String>,
        collection: impl Into<String>,
        index_type: IndexType,
        fields: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            index_type,
            fields,
            unique: false,
            sparse: false,
            selectivity_estimate: 1.0,
            cache_enabled: false,
        }
    }

    /// 集合的主索引
    pub fn primary(collection: &str) -> Self {
        let mut index = Self::new(
            format!("{}/0", collection),
            collection,
            IndexType::Primary,
            vec!["_key".to_string()],
        );
        index.unique = true;
        index
    }

    /// 边集合的边索引
    pub fn edge(collection: &str) -> Self {
        Self::new(
            format!("{}/1", collection),
            collection,
            IndexType::Edge,
            vec!["_from".to_string(), "_to".to_string()],
        )
    }

    /// 各字段拆分后的属性路径
    pub fn field_paths(&self) -> Vec<Vec<String>> {
        self.fields
            .iter()
            .map(|f| f.split('.').map(str::to_string).collect())
            .collect()
    }

    /// 字段在索引中的位置
    pub fn field_position(&self, path: &[String]) -> Option<usize> {
        self.field_paths().iter().position(|p| p.as_slice() == path)
    }

    /// 索引覆盖的行对排序有用：有序且非稀疏（稀疏索引不包含 null 值的文档）
    pub fn can_serve_sort(&self) -> bool {
        self.index_type.is_sorted() && !self.sparse
    }
}

/// 创建索引的选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sparse: bool,
    #[serde(default)]
    pub cache_enabled: bool,
}

impl IndexOptions {
    pub fn new(index_type: IndexType, fields: &[&str]) -> Self {
        Self {
            index_type,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
            sparse: false,
            cache_enabled: false,
        }
    }

    pub fn persistent(fields: &[&str]) -> Self {
        Self::new(IndexType::Persistent, fields)
    }

    pub fn hash(fields: &[&str]) -> Self {
        Self::new(IndexType::Hash, fields)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }
}
