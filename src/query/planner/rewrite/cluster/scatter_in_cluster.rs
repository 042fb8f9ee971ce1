//! 集合迭代分片规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   Singleton -> EnumerateCollection(doc IN c) -> Return
//! ```
//!
//! After:
//! ```text
//!   Singleton -> Scatter -> Remote(dbservers) -> EnumerateCollection(doc IN c)
//!             -> Remote(coordinator) -> Gather -> Return
//! ```
//!
//! 有序索引迭代的顺序写入 Gather 的归并条件。

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::cluster::{COORDINATOR, DBSERVERS};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 给每个集合迭代包上 Scatter/Remote/Gather
    name: ScatterInClusterRule,
    rule_name: "scatter-in-cluster",
    pattern: Pattern::new().and_any(vec![PlanNodeType::EnumerateCollection, PlanNodeType::Index]),
    apply: scatter_in_cluster
}

/// 沿下游跳过已下发到分片的计算、过滤与排序后遇到协调节点 Remote
///
/// 分片侧的 Scatter/Remote 可能已被删除，只能从下游判断。
fn is_wrapped(plan: &ExecutionPlan, scan: NodeId) -> bool {
    let mut current = plan.dependent(scan);
    while let Some(id) = current {
        match plan.kind(id) {
            Some(PlanNodeKind::Remote { server, .. }) => return server == COORDINATOR,
            Some(
                PlanNodeKind::Calculation { .. } | PlanNodeKind::Filter { .. } | PlanNodeKind::Sort { .. },
            ) => current = plan.dependent(id),
            _ => return false,
        }
    }
    false
}

fn wrap(plan: &mut ExecutionPlan, scan: NodeId) -> RewriteResult<bool> {
    let (collection, ordered) = match plan.kind(scan) {
        Some(PlanNodeKind::EnumerateCollection { collection, .. }) => (collection.clone(), Vec::new()),
        Some(PlanNodeKind::Index {
            collection, ordered, ..
        }) => (collection.clone(), ordered.clone()),
        _ => return Ok(false),
    };
    if is_wrapped(plan, scan) || plan.dependent(scan).is_none() {
        return Ok(false);
    }

    let scatter = plan.create_node(PlanNodeKind::Scatter, None)?;
    plan.insert_dependency(scan, scatter)?;
    let remote = plan.create_node(
        PlanNodeKind::Remote {
            collection: collection.clone(),
            server: DBSERVERS.to_string(),
        },
        None,
    )?;
    plan.insert_dependency(scan, remote)?;
    let coordinator = plan.insert_after(
        scan,
        PlanNodeKind::Remote {
            collection,
            server: COORDINATOR.to_string(),
        },
    )?;
    plan.insert_after(coordinator, PlanNodeKind::Gather { elements: ordered })?;
    Ok(true)
}

fn scatter_in_cluster(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;
    let scans = plan
        .find_nodes(PlanNodeType::EnumerateCollection)
        .into_iter()
        .chain(plan.find_nodes(PlanNodeType::Index));
    for scan in scans {
        changed |= wrap(&mut result, scan)?;
    }
    Ok(TransformResult::from_plan(changed, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;
    use crate::core::types::expression::Expression;
    use crate::query::planner::plan::{PlanBuilder, WalkOrder};
    use crate::query::planner::rewrite::cluster::{
        DistributeFilterCalcToClusterRule, DistributeSortToClusterRule, RemoveUnnecessaryRemoteScatterRule,
    };
    use crate::query::planner::rewrite::rule::RewriteRule;

    #[test]
    fn test_scan_is_wrapped_once() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let mut ctx = RewriteContext::new().with_cluster(ClusterConfig::with_shards(3));
        let result = ScatterInClusterRule::new().apply(&mut ctx, &plan).unwrap();
        assert!(result.changed);
        let plan = &result.plans[0];
        plan.validate().unwrap();
        let types: Vec<PlanNodeType> = plan.walk(WalkOrder::Dependency).map(|n| n.node_type()).collect();
        assert_eq!(
            types,
            vec![
                PlanNodeType::Singleton,
                PlanNodeType::Scatter,
                PlanNodeType::Remote,
                PlanNodeType::EnumerateCollection,
                PlanNodeType::Remote,
                PlanNodeType::Gather,
                PlanNodeType::Return,
            ]
        );

        let again = ScatterInClusterRule::new().apply(&mut ctx, plan).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_scan_with_distributed_calculation_is_not_rewrapped() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::gt(Expression::attribute_path(doc, "value"), Expression::literal(1)));
        builder.sort(vec![(Expression::attribute_path(doc, "name"), true)]);
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let mut ctx = RewriteContext::new().with_cluster(ClusterConfig::with_shards(3));
        let step = ScatterInClusterRule::new().apply(&mut ctx, &plan).unwrap();
        let step = DistributeFilterCalcToClusterRule::new()
            .apply(&mut ctx, &step.plans[0])
            .unwrap();
        assert!(step.changed);
        let step = DistributeSortToClusterRule::new()
            .apply(&mut ctx, &step.plans[0])
            .unwrap();
        assert!(step.changed);

        let again = ScatterInClusterRule::new().apply(&mut ctx, &step.plans[0]).unwrap();
        assert!(!again.changed);
        assert_eq!(again.plans[0].find_nodes(PlanNodeType::Gather).len(), 1);
    }

    #[test]
    fn test_scan_without_shard_remote_is_not_rewrapped() {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let mut ctx = RewriteContext::new().with_cluster(ClusterConfig::with_shards(3));
        let step = ScatterInClusterRule::new().apply(&mut ctx, &plan).unwrap();
        let step = RemoveUnnecessaryRemoteScatterRule::new()
            .apply(&mut ctx, &step.plans[0])
            .unwrap();
        assert!(step.changed);

        let again = ScatterInClusterRule::new().apply(&mut ctx, &step.plans[0]).unwrap();
        assert!(!again.changed);
    }
}
