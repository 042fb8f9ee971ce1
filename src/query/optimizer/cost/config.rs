//! 代价模型配置模块
//!
//! 代价只用于在候选计划之间做比较，不对应真实耗时。默认值让一次全集合扫描的
//! 代价约等于集合文档数。
//!
//! ## 使用示例
//!
//! ```rust
//! use aql_optimizer::query::optimizer::cost::CostModelConfig;
//!
//! // 使用默认配置
//! let config = CostModelConfig::default();
//!
//! // 集群部署下网络传输更贵
//! let cluster = CostModelConfig::default().with_remote_row_cost(0.5);
//! assert!(cluster.remote_row_cost > config.remote_row_cost);
//! ```

use serde::{Deserialize, Serialize};

/// 代价模型配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
    /// 每产生或处理一行的代价。默认值 1.0
    pub cpu_tuple_cost: f64,

    /// 索引查找时每下降一层的代价。默认值 1.0
    ///
    /// 一次索引查找约为 `log2(n)` 层
    pub cpu_index_tuple_cost: f64,

    /// 每行计算一次表达式的代价。默认值 1.0
    pub cpu_operator_cost: f64,

    /// 排序每次比较的代价系数。默认值 1.0
    pub sort_comparison_cost: f64,

    /// Remote 节点每转发一行的代价。默认值 0.1
    pub remote_row_cost: f64,

    /// 无法分析的过滤条件的默认选择率。默认值 0.5
    pub default_filter_selectivity: f64,

    /// 等值条件的默认选择率。默认值 0.1
    pub default_equality_selectivity: f64,

    /// 范围条件的默认选择率。默认值 0.333
    pub default_range_selectivity: f64,

    /// 集合文档数未知时假定的大小。默认值 1000
    pub default_collection_count: u64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            cpu_tuple_cost: 1.0,
            cpu_index_tuple_cost: 1.0,
            cpu_operator_cost: 1.0,
            sort_comparison_cost: 1.0,
            remote_row_cost: 0.1,
            default_filter_selectivity: 0.5,
            default_equality_selectivity: 0.1,
            default_range_selectivity: 0.333,
            default_collection_count: 1000,
        }
    }
}

impl CostModelConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置行处理代价
    pub fn with_cpu_tuple_cost(mut self, cost: f64) -> Self {
        self.cpu_tuple_cost = cost;
        self
    }

    /// 设置索引查找代价
    pub fn with_cpu_index_tuple_cost(mut self, cost: f64) -> Self {
        self.cpu_index_tuple_cost = cost;
        self
    }

    /// 设置表达式计算代价
    pub fn with_cpu_operator_cost(mut self, cost: f64) -> Self {
        self.cpu_operator_cost = cost;
        self
    }

    /// 设置排序比较代价
    pub fn with_sort_comparison_cost(mut self, cost: f64) -> Self {
        self.sort_comparison_cost = cost;
        self
    }

    /// 设置 Remote 转发代价
    pub fn with_remote_row_cost(mut self, cost: f64) -> Self {
        self.remote_row_cost = cost;
        self
    }
}
