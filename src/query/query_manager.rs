//! 查询管理器
//!
//! 跟踪正在执行的查询，支持按 id 终止。执行方持有 `QueryGuard`，游标在每次
//! 取批次前检查终止标记；guard 释放时查询从列表中移除。

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// 查询状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

/// 正在执行的查询
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInfo {
    pub id: u64,
    pub query: String,
    pub started: DateTime<Utc>,
    /// 已运行的秒数
    pub run_time: f64,
    pub status: QueryStatus,
}

#[derive(Debug)]
struct QueryEntry {
    query: String,
    started: DateTime<Utc>,
    clock: Instant,
    killed: Arc<AtomicBool>,
}

/// 查询统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub total_queries: u64,
    pub running_queries: u64,
    pub finished_queries: u64,
    pub failed_queries: u64,
    pub killed_queries: u64,
}

/// 查询管理器
#[derive(Debug, Default)]
pub struct QueryManager {
    queries: DashMap<u64, QueryEntry>,
    next_id: AtomicU64,
    finished: AtomicU64,
    failed: AtomicU64,
    killed: AtomicU64,
}

impl QueryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新查询
    pub fn register(self: &Arc<Self>, query: impl Into<String>) -> QueryGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let query = query.into();
        let killed = Arc::new(AtomicBool::new(false));
        info!("Query registered: id={}, query={}", id, query);
        self.queries.insert(
            id,
            QueryEntry {
                query,
                started: Utc::now(),
                clock: Instant::now(),
                killed: killed.clone(),
            },
        );
        QueryGuard {
            id,
            manager: Arc::clone(self),
            killed,
            status: QueryStatus::Running,
        }
    }

    /// 标记查询终止，查询在下一次取批次时以 1500 失败
    pub fn kill_query(&self, id: u64) -> bool {
        match self.queries.get(&id) {
            Some(entry) => {
                entry.killed.store(true, Ordering::SeqCst);
                warn!("Query killed: id={}", id);
                true
            }
            None => {
                warn!("Kill requested for unknown query: id={}", id);
                false
            }
        }
    }

    /// 正在运行的查询，按 id 升序
    pub fn running(&self) -> Vec<QueryInfo> {
        let mut running: Vec<QueryInfo> = self
            .queries
            .iter()
            .map(|entry| QueryInfo {
                id: *entry.key(),
                query: entry.query.clone(),
                started: entry.started,
                run_time: entry.clock.elapsed().as_secs_f64(),
                status: if entry.killed.load(Ordering::SeqCst) {
                    QueryStatus::Killed
                } else {
                    QueryStatus::Running
                },
            })
            .collect();
        running.sort_by_key(|q| q.id);
        running
    }

    pub fn stats(&self) -> QueryStats {
        let finished = self.finished.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let killed = self.killed.load(Ordering::Relaxed);
        let running = self.queries.len() as u64;
        QueryStats {
            total_queries: running + finished + failed + killed,
            running_queries: running,
            finished_queries: finished,
            failed_queries: failed,
            killed_queries: killed,
        }
    }

    fn unregister(&self, id: u64, status: QueryStatus) {
        let Some((_, entry)) = self.queries.remove(&id) else {
            return;
        };
        let elapsed = entry.clock.elapsed().as_millis();
        match status {
            QueryStatus::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Query failed: id={}, duration={}ms", id, elapsed);
            }
            QueryStatus::Killed => {
                self.killed.fetch_add(1, Ordering::Relaxed);
                warn!("Query aborted after kill: id={}, duration={}ms", id, elapsed);
            }
            QueryStatus::Running | QueryStatus::Finished => {
                self.finished.fetch_add(1, Ordering::Relaxed);
                info!("Query finished: id={}, duration={}ms", id, elapsed);
            }
        }
    }
}

/// 查询登记凭据，释放时注销查询
#[derive(Debug)]
pub struct QueryGuard {
    id: u64,
    manager: Arc<QueryManager>,
    killed: Arc<AtomicBool>,
    status: QueryStatus,
}

impl QueryGuard {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// 设置注销时记录的最终状态
    pub fn set_status(&mut self, status: QueryStatus) {
        self.status = status;
    }
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        self.manager.unregister(self.id, self.status);
    }
}
