//! 集群规则
//!
//! 只在集群模式下运行。集合按文档键分片，读取集合的部分在每个分片上各执行一次：
//!
//! ```text
//!   Scatter -> Remote(dbservers) -> [分片部分] -> Remote(coordinator) -> Gather
//! ```
//!
//! - 给集合迭代包上分发与汇总节点 (`ScatterInClusterRule`)
//! - 把 Gather 之后的确定性计算与过滤移到分片部分 (`DistributeFilterCalcToClusterRule`)
//! - 把 Gather 之后的排序移到分片部分，Gather 改为归并 (`DistributeSortToClusterRule`)
//! - 上游只有常量计算时去掉 Scatter 与 Remote (`RemoveUnnecessaryRemoteScatterRule`)

pub mod distribute_filtercalc_to_cluster;
pub mod distribute_sort_to_cluster;
pub mod remove_unnecessary_remote_scatter;
pub mod scatter_in_cluster;

pub use distribute_filtercalc_to_cluster::DistributeFilterCalcToClusterRule;
pub use distribute_sort_to_cluster::DistributeSortToClusterRule;
pub use remove_unnecessary_remote_scatter::RemoveUnnecessaryRemoteScatterRule;
pub use scatter_in_cluster::ScatterInClusterRule;

use crate::core::types::NodeId;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind};

/// 分片一侧的 Remote 节点
pub const DBSERVERS: &str = "dbservers";
/// 协调节点一侧的 Remote 节点
pub const COORDINATOR: &str = "coordinator";

/// Gather 正上方的协调节点 Remote
pub(crate) fn coordinator_remote(plan: &ExecutionPlan, gather: NodeId) -> Option<NodeId> {
    let remote = plan.dependency(gather)?;
    match plan.kind(remote)? {
        PlanNodeKind::Remote { server, .. } if server == COORDINATOR => Some(remote),
        _ => None,
    }
}
