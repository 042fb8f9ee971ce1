//! 存储层公共类型

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// 集合类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    #[default]
    Document,
    Edge,
}

/// 边的遍历方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
    Any,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
            Direction::Any => "any",
        }
    }
}

/// 分片选择：只读取 `count` 个分片中的第 `index` 个
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShardSpec {
    pub index: usize,
    pub count: usize,
}

impl ShardSpec {
    pub fn new(index: usize, count: usize) -> Self {
        Self { index, count }
    }

    /// 文档键是否属于该分片
    pub fn contains(&self, key: &str) -> bool {
        self.count <= 1 || shard_of(key, self.count) == self.index
    }
}

/// 按文档键计算分片编号
pub fn shard_of(key: &str, shards: usize) -> usize {
    if shards <= 1 {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shards_partition_keys() {
        let shards = 3;
        for i in 0..100 {
            let key = format!("k{}", i);
            let owners: Vec<usize> = (0..shards)
                .filter(|s| ShardSpec::new(*s, shards).contains(&key))
                .collect();
            assert_eq!(owners.len(), 1);
        }
        assert!(ShardSpec::new(0, 1).contains("anything"));
    }
}
