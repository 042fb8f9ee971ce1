//! 执行统计
//!
//! 随 execute 结果返回给调用方；测试比较结果前会去掉统计部分。

use serde::{Deserialize, Serialize};

/// 一次查询的执行统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    /// 成功执行的写操作
    pub writes_executed: u64,
    /// 因 `ignoreErrors` 被忽略的写操作
    pub writes_ignored: u64,
    /// 全集合扫描读取的文档数
    pub scanned_full: u64,
    /// 索引扫描读取的文档数
    pub scanned_index: u64,
    /// 被过滤掉的行数
    pub filtered: u64,
    /// Remote 节点发出的请求数
    pub http_requests: u64,
    /// LIMIT 之前的总行数，只在 `fullCount` 时填写
    pub full_count: Option<u64>,
    /// 执行耗时（秒）
    pub execution_time: f64,
    /// 物化结果的峰值内存估算（字节）
    pub peak_memory_usage: u64,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并另一份统计，耗时与峰值内存取较大值
    pub fn merge(&mut self, other: &ExecutionStats) {
        self.writes_executed += other.writes_executed;
        self.writes_ignored += other.writes_ignored;
        self.scanned_full += other.scanned_full;
        self.scanned_index += other.scanned_index;
        self.filtered += other.filtered;
        self.http_requests += other.http_requests;
        if other.full_count.is_some() {
            self.full_count = other.full_count;
        }
        self.execution_time = self.execution_time.max(other.execution_time);
        self.peak_memory_usage = self.peak_memory_usage.max(other.peak_memory_usage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_names() {
        let stats = ExecutionStats {
            scanned_full: 3,
            http_requests: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["scannedFull"], 3);
        assert_eq!(json["httpRequests"], 2);
        assert!(json["fullCount"].is_null());
    }

    #[test]
    fn test_merge() {
        let mut a = ExecutionStats {
            filtered: 1,
            peak_memory_usage: 10,
            ..Default::default()
        };
        let b = ExecutionStats {
            filtered: 2,
            peak_memory_usage: 5,
            full_count: Some(7),
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.filtered, 3);
        assert_eq!(a.peak_memory_usage, 10);
        assert_eq!(a.full_count, Some(7));
    }
}
