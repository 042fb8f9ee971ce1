//! 查询选项
//!
//! 与 AQL 游标接口的选项同名（camelCase），可直接从请求 JSON 反序列化。
//!
//! ```rust
//! use aql_optimizer::query::optimizer::QueryOptions;
//!
//! let options: QueryOptions = serde_json::from_str(
//!     r#"{"optimizer": {"rules": ["-all", "+use-indexes"]}, "allPlans": true}"#,
//! ).unwrap();
//! assert!(options.all_plans);
//! assert_eq!(options.optimizer.rules.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

/// `optimizer` 子选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    /// 规则开关，形如 `-all`、`+use-indexes`、`-move-calculations-down`
    pub rules: Vec<String>,
}

/// 单次查询的选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryOptions {
    pub optimizer: OptimizerOptions,
    /// explain 返回全部候选计划
    pub all_plans: bool,
    /// explain 输出中保留内部细节
    pub verbose_plans: bool,
    /// 覆盖配置中的候选计划数上限
    pub max_number_of_plans: Option<usize>,
    /// 覆盖配置中的批大小
    pub batch_size: Option<usize>,
    /// LIMIT 之外仍统计总行数
    pub full_count: bool,
    /// 返回执行统计中的耗时信息
    pub profile: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules<S: AsRef<str>>(mut self, rules: &[S]) -> Self {
        self.optimizer.rules = rules.iter().map(|r| r.as_ref().to_string()).collect();
        self
    }

    pub fn with_all_plans(mut self) -> Self {
        self.all_plans = true;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_max_number_of_plans(mut self, max: usize) -> Self {
        self.max_number_of_plans = Some(max);
        self
    }

    pub fn with_full_count(mut self) -> Self {
        self.full_count = true;
        self
    }
}
