//! 配置
//!
//! TOML 格式，所有字段都有默认值，配置文件里只需要写要覆盖的部分。
//!
//! ```toml
//! [log]
//! level = "debug"
//!
//! [optimizer]
//! max_iterations = 500
//!
//! [optimizer.cluster]
//! enabled = true
//! shards = 3
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::query::optimizer::cost::CostModelConfig;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub optimizer: OptimizerConfig,
    pub executor: ExecutorConfig,
    pub cost: CostModelConfig,
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "aqlopt".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

/// 优化器配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct OptimizerConfig {
    /// 规则引起的重跑次数上限，超过即报 `OptimizerIterationLimitExceeded`
    pub max_iterations: usize,
    /// 候选计划数上限
    pub max_number_of_plans: usize,
    pub cluster: ClusterConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_number_of_plans: 128,
            cluster: ClusterConfig::default(),
        }
    }
}

/// 集群模式；启用后集群专用规则才会运行
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterConfig {
    pub enabled: bool,
    pub shards: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shards: 3,
        }
    }
}

impl ClusterConfig {
    pub fn single_server() -> Self {
        Self::default()
    }

    pub fn with_shards(shards: usize) -> Self {
        Self {
            enabled: true,
            shards: shards.max(1),
        }
    }
}

/// 执行器配置
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutorConfig {
    pub batch_size: usize,
    pub lock_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            lock_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
