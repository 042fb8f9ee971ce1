//! 集群模式集成测试
//!
//! 测试范围:
//! - scatter-in-cluster 生成的 Scatter/Remote/Gather 结构
//! - use-index-for-sort 与 Gather 归并条件
//! - 分片合并后的行数与顺序

mod common;

use serde_json::{json, Value};

use aql_optimizer::core::types::expression::Expression;
use aql_optimizer::query::optimizer::QueryOptions;
use aql_optimizer::query::planner::plan::{ExecutionPlan, PlanBuilder};

use common::assertions::{assert_monotonic, assert_rule_applied, assert_same_rows};
use common::data_fixtures::{sorted_storage, standard_storage};

const SHARDS: usize = 3;

/// FOR doc IN sorted SORT doc.value [ASC|DESC] RETURN doc.value
fn sorted_plan(ascending: bool) -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("sorted", "doc");
    builder.sort(vec![(Expression::attribute_path(doc, "value"), ascending)]);
    builder.return_(Expression::attribute_path(doc, "value"));
    builder.build().unwrap()
}

fn gather_ascending(plan: &aql_optimizer::query::planner::plan::PlanDescription) -> Value {
    let gather = plan.find("GatherNode").expect("集群计划应包含 GatherNode");
    gather.detail("elements").unwrap()[0]["ascending"].clone()
}

#[test]
fn test_scatter_in_cluster_wraps_scan() {
    let engine = common::cluster_engine(standard_storage(), SHARDS);
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let explained = common::explain(&engine, plan, &QueryOptions::default());
    assert_rule_applied(&explained.plan, "scatter-in-cluster");
    let types = explained.plan.node_types();
    assert!(types.contains(&"RemoteNode"));
    assert!(types.contains(&"GatherNode"));
    let gather = types.iter().position(|t| *t == "GatherNode").unwrap();
    let scan = types.iter().position(|t| *t == "EnumerateCollectionNode").unwrap();
    assert!(scan < gather);
    assert_eq!(types.last(), Some(&"ReturnNode"));
}

#[test]
fn test_cluster_rules_skipped_on_single_server() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let explained = common::explain(&engine, plan, &QueryOptions::default());
    assert!(explained.plan.find("GatherNode").is_none());
    assert!(explained.plan.find("RemoteNode").is_none());
}

#[test]
fn test_index_for_sort_ascending() {
    let engine = common::cluster_engine(sorted_storage(100, 1), SHARDS);
    let explained = common::explain(&engine, sorted_plan(true), &QueryOptions::default());
    assert_rule_applied(&explained.plan, "use-index-for-sort");
    assert!(explained.plan.find("SortNode").is_none());
    assert_eq!(gather_ascending(&explained.plan), json!(true));
    let index = explained.plan.find("IndexNode").unwrap();
    assert_eq!(index.detail("reverse"), Some(&json!(false)));
}

#[test]
fn test_index_for_sort_descending() {
    let engine = common::cluster_engine(sorted_storage(100, 1), SHARDS);
    let explained = common::explain(&engine, sorted_plan(false), &QueryOptions::default());
    assert_rule_applied(&explained.plan, "use-index-for-sort");
    assert!(explained.plan.find("SortNode").is_none());
    assert_eq!(gather_ascending(&explained.plan), json!(false));
    let index = explained.plan.find("IndexNode").unwrap();
    assert_eq!(index.detail("reverse"), Some(&json!(true)));
}

#[test]
fn test_merge_keeps_duplicates_sorted() {
    let storage = sorted_storage(2000, 2);
    let engine = common::cluster_engine(storage.clone(), SHARDS);

    for ascending in [true, false] {
        let result = common::execute(&engine, sorted_plan(ascending), &QueryOptions::default());
        assert_rule_applied(&result.plan, "use-index-for-sort");
        assert_eq!(result.json.len(), 4000);
        assert_monotonic(&result.json, ascending);
        assert_eq!(result.stats.scanned_full, 0);
        assert!(result.stats.http_requests > 0);
    }

    // 单机未优化的结果作为基线
    let single = common::engine(storage);
    let baseline = common::results(&single, sorted_plan(true), &common::rules(&["-all"]));
    let clustered = common::results(&engine, sorted_plan(true), &QueryOptions::default());
    assert_eq!(baseline, clustered);
}

#[test]
fn test_sort_without_index_is_distributed() {
    let engine = common::cluster_engine(standard_storage(), SHARDS);
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.sort(vec![(Expression::attribute_path(doc, "name"), false)]);
        builder.return_(Expression::attribute_path(doc, "name"));
        builder.build().unwrap()
    };

    let result = common::execute(&engine, plan(), &QueryOptions::default());
    assert_rule_applied(&result.plan, "distribute-sort-to-cluster");
    assert_eq!(gather_ascending(&result.plan), json!(false));

    let single = common::engine(standard_storage());
    let baseline = common::results(&single, plan(), &common::rules(&["-all"]));
    assert_eq!(baseline, result.json);
}

#[test]
fn test_filter_moves_into_shards() {
    let engine = common::cluster_engine(standard_storage(), SHARDS);
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::gt(Expression::attribute_path(doc, "name"), Expression::literal("name8")));
        builder.return_(Expression::attribute_path(doc, "name"));
        builder.build().unwrap()
    };

    let result = common::execute(&engine, plan(), &QueryOptions::default());
    assert_rule_applied(&result.plan, "distribute-filtercalc-to-cluster");
    let types = result.plan.node_types();
    let filter = types.iter().position(|t| *t == "FilterNode").unwrap();
    let gather = types.iter().position(|t| *t == "GatherNode").unwrap();
    assert!(filter < gather);

    let single = common::engine(standard_storage());
    let baseline = common::results(&single, plan(), &common::rules(&["-all"]));
    assert_same_rows(&baseline, &result.json, "filter in shards");
}

#[test]
fn test_distributed_calculation_reaches_fixpoint() {
    let engine = common::cluster_engine(standard_storage(), SHARDS);
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let g = builder.let_("g", Expression::attribute_path(doc, "group"));
        builder.filter(Expression::lt(Expression::reference(g), Expression::literal(2)));
        builder.return_(Expression::reference(g));
        builder.build().unwrap()
    };

    let tokens = ["-all", "+scatter-in-cluster", "+distribute-filtercalc-to-cluster"];
    let result = common::execute(&engine, plan(), &common::rules(&tokens));
    assert_rule_applied(&result.plan, "distribute-filtercalc-to-cluster");
    let gathers = result.plan.node_types().iter().filter(|t| **t == "GatherNode").count();
    assert_eq!(gathers, 1);

    let single = common::engine(standard_storage());
    let baseline = common::results(&single, plan(), &common::rules(&["-all"]));
    assert_same_rows(&baseline, &result.json, "distributed calculation");
}
