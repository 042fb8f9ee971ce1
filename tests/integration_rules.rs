//! 单条重写规则的集成测试
//!
//! 测试范围:
//! - remove-sort-rand 的每个否决条件
//! - use-indexes / remove-filter-covered-by-index
//! - remove-redundant-sorts / remove-unnecessary-filters
//! - interchange-adjacent-enumerations

mod common;

use std::collections::HashSet;

use serde_json::{json, Value};

use aql_optimizer::core::types::expression::Expression;
use aql_optimizer::query::optimizer::QueryOptions;
use aql_optimizer::query::planner::plan::{AggregateFunction, ExecutionPlan, PlanBuilder};

use common::assertions::{assert_rule_applied, assert_rule_not_applied, assert_same_rows};
use common::data_fixtures::{standard_storage, DOCUMENTS};

const SORT_RAND: &[&str] = &["-all", "+remove-sort-rand"];

fn rand() -> Expression {
    Expression::function("RAND", vec![])
}

fn keys(rows: &[Value]) -> HashSet<String> {
    rows.iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

/// 断言 SORT RAND() 没有被消除
fn assert_sort_rand_kept(plan: ExecutionPlan) {
    let engine = common::engine(standard_storage());
    let explained = common::explain(&engine, plan, &common::rules(SORT_RAND));
    assert_rule_not_applied(&explained.plan, "remove-sort-rand");
    assert!(explained.plan.find("SortNode").is_some());
}

#[test]
fn test_sort_rand_is_removed() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.sort(vec![(rand(), true)]);
        builder.return_(Expression::attribute_path(doc, "_key"));
        builder.build().unwrap()
    };

    let explained = common::explain(&engine, plan(), &common::rules(SORT_RAND));
    assert_rule_applied(&explained.plan, "remove-sort-rand");
    assert!(explained.plan.find("SortNode").is_none());
    let scan = explained.plan.find("EnumerateCollectionNode").unwrap();
    assert_eq!(scan.detail("random"), Some(&json!(true)));

    let rows = common::results(&engine, plan(), &QueryOptions::default());
    assert_eq!(rows.len(), DOCUMENTS);
    assert_eq!(keys(&rows).len(), DOCUMENTS);
}

#[test]
fn test_sort_rand_with_limit_has_no_duplicates() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.sort(vec![(rand(), true)]);
    builder.limit(0, 10);
    builder.return_(Expression::attribute_path(doc, "_key"));
    let plan = builder.build().unwrap();

    let result = common::execute(&engine, plan, &QueryOptions::default());
    assert_rule_applied(&result.plan, "remove-sort-rand");
    assert_eq!(result.json.len(), 10);
    assert_eq!(keys(&result.json).len(), 10);
}

#[test]
fn test_sort_rand_kept_with_second_criterion() {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.sort(vec![(rand(), true), (Expression::attribute_path(doc, "value"), true)]);
    builder.return_(Expression::reference(doc));
    assert_sort_rand_kept(builder.build().unwrap());
}

#[test]
fn test_sort_rand_kept_with_multiple_collections() {
    let mut builder = PlanBuilder::new();
    let a = builder.for_collection("c", "a");
    let b = builder.for_collection("d", "b");
    builder.sort(vec![(rand(), true)]);
    builder.return_(Expression::array(vec![Expression::reference(a), Expression::reference(b)]));
    assert_sort_rand_kept(builder.build().unwrap());
}

#[test]
fn test_sort_rand_kept_with_filter() {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::gt(Expression::attribute_path(doc, "name"), Expression::literal("name5")));
    builder.sort(vec![(rand(), true)]);
    builder.return_(Expression::reference(doc));
    assert_sort_rand_kept(builder.build().unwrap());
}

#[test]
fn test_sort_rand_kept_with_collect() {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    let vars = builder.collect(vec![("v", Expression::attribute_path(doc, "value"))], vec![], None);
    builder.sort(vec![(rand(), true)]);
    builder.return_(Expression::reference(vars.groups[0]));
    assert_sort_rand_kept(builder.build().unwrap());
}

#[test]
fn test_sort_rand_kept_with_subquery() {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    let sub = builder.subquery("sub", |b| {
        let j = b.for_list(Expression::array(vec![Expression::literal(1), Expression::literal(2)]), "j");
        b.return_(Expression::reference(j));
    });
    builder.sort(vec![(rand(), true)]);
    builder.return_(Expression::array(vec![Expression::reference(doc), Expression::reference(sub)]));
    assert_sort_rand_kept(builder.build().unwrap());
}

#[test]
fn test_sort_rand_kept_inside_nested_loop() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    builder.for_list(Expression::range(Expression::literal(1), Expression::literal(3)), "i");
    let doc = builder.for_collection("c", "doc");
    builder.sort(vec![(rand(), true)]);
    builder.return_(Expression::attribute_path(doc, "_key"));
    let plan = builder.build().unwrap();

    let explained = common::explain(&engine, plan.clone(), &common::rules(SORT_RAND));
    assert_rule_not_applied(&explained.plan, "remove-sort-rand");

    // 每个 key 恰好出现 外层次数 次
    let rows = common::results(&engine, plan, &QueryOptions::default());
    assert_eq!(rows.len(), 3 * DOCUMENTS);
    assert_eq!(keys(&rows).len(), DOCUMENTS);
}

#[test]
fn test_use_indexes_replaces_scan() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(7)));
        builder.return_(Expression::attribute_path(doc, "_key"));
        builder.build().unwrap()
    };

    let result = common::execute(&engine, plan(), &QueryOptions::default());
    assert_rule_applied(&result.plan, "use-indexes");
    assert_rule_applied(&result.plan, "remove-filter-covered-by-index");
    assert!(result.plan.find("EnumerateCollectionNode").is_none());
    assert!(result.plan.find("FilterNode").is_none());
    let index = result.plan.find("IndexNode").unwrap();
    assert_eq!(index.detail("collection"), Some(&json!("c")));
    assert_eq!(result.json.len(), DOCUMENTS / 10);
    assert_eq!(result.stats.scanned_full, 0);
    assert_eq!(result.stats.scanned_index, (DOCUMENTS / 10) as u64);

    let baseline = common::results(&engine, plan(), &common::rules(&["-all"]));
    assert_same_rows(&baseline, &result.json, "use-indexes");
}

#[test]
fn test_partially_covered_filter_keeps_residual() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::and(
            Expression::gt(Expression::attribute_path(doc, "value"), Expression::literal(6)),
            Expression::eq(Expression::function("LENGTH", vec![Expression::attribute_path(doc, "name")]), Expression::literal(6)),
        ));
        builder.return_(Expression::attribute_path(doc, "_key"));
        builder.build().unwrap()
    };

    let options = common::rules(&["-all", "+use-indexes", "+remove-filter-covered-by-index"]);
    let result = common::execute(&engine, plan(), &options);
    assert_rule_applied(&result.plan, "use-indexes");
    assert!(result.plan.find("IndexNode").is_some());
    assert!(result.plan.find("FilterNode").is_some());

    let baseline = common::results(&engine, plan(), &common::rules(&["-all"]));
    assert_same_rows(&baseline, &result.json, "residual filter");
}

#[test]
fn test_index_lookup_with_bind_parameter() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::eq(
        Expression::attribute_path(doc, "group"),
        Expression::bind_parameter("g"),
    ));
    builder.return_(Expression::attribute_path(doc, "group"));
    let plan = builder.build().unwrap();

    let result = engine
        .execute(plan, &common::bind_vars(&[("g", json!(2))]), &QueryOptions::default())
        .unwrap();
    assert_rule_applied(&result.plan, "use-indexes");
    assert_eq!(result.json.len(), DOCUMENTS / 4);
    assert!(result.json.iter().all(|v| v == &json!(2)));
}

#[test]
fn test_constant_filters() {
    let engine = common::engine(standard_storage());
    let plan = |condition: bool| {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("d", "doc");
        builder.filter(Expression::literal(condition));
        builder.return_(Expression::reference(doc));
        builder.build().unwrap()
    };

    let options = common::rules(&["-all", "+remove-unnecessary-filters"]);
    let kept = common::execute(&engine, plan(true), &options);
    assert_rule_applied(&kept.plan, "remove-unnecessary-filters");
    assert!(kept.plan.find("FilterNode").is_none());
    assert_eq!(kept.json.len(), 5);

    let dropped = common::execute(&engine, plan(false), &options);
    assert!(dropped.plan.find("NoResultsNode").is_some());
    assert!(dropped.json.is_empty());
}

#[test]
fn test_redundant_sort_removed() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let group = builder.calculate(Expression::attribute_path(doc, "group"));
        let name = builder.calculate(Expression::attribute_path(doc, "name"));
        builder.sort(vec![(Expression::reference(group), true)]);
        builder.sort(vec![
            (Expression::reference(group), true),
            (Expression::reference(name), true),
        ]);
        builder.return_(Expression::attribute_path(doc, "name"));
        builder.build().unwrap()
    };

    let options = common::rules(&["-all", "+remove-redundant-sorts"]);
    let result = common::execute(&engine, plan(), &options);
    assert_rule_applied(&result.plan, "remove-redundant-sorts");
    assert_eq!(result.plan.node_types().iter().filter(|t| **t == "SortNode").count(), 1);

    // 有排序时按顺序比较
    let baseline = common::results(&engine, plan(), &common::rules(&["-all"]));
    assert_eq!(baseline, result.json);
}

#[test]
fn test_or_becomes_in() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let value = || Expression::attribute_path(doc, "value");
        builder.filter(Expression::or(
            Expression::eq(value(), Expression::literal(1)),
            Expression::eq(value(), Expression::literal(2)),
        ));
        builder.return_(Expression::attribute_path(doc, "value"));
        builder.build().unwrap()
    };

    let result = common::execute(&engine, plan(), &QueryOptions::default());
    assert_rule_applied(&result.plan, "replace-or-with-in");
    assert_rule_applied(&result.plan, "use-indexes");
    assert_eq!(result.json.len(), 2 * DOCUMENTS / 10);

    let baseline = common::results(&engine, plan(), &common::rules(&["-all"]));
    assert_same_rows(&baseline, &result.json, "or to in");
}

#[test]
fn test_adjacent_enumerations_fork_candidates() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let a = builder.for_collection("d", "a");
        let b = builder.for_collection("c", "b");
        builder.return_(Expression::array(vec![
            Expression::attribute_path(a, "_key"),
            Expression::attribute_path(b, "_key"),
        ]));
        builder.build().unwrap()
    };

    let options = common::rules(&["-all", "+interchange-adjacent-enumerations"]).with_all_plans();
    let explained = common::explain(&engine, plan(), &options);
    assert_eq!(explained.plans.len(), 2);
    assert!(explained
        .plans
        .iter()
        .any(|p| p.rules.contains(&"interchange-adjacent-enumerations".to_string())));

    let baseline = common::results(&engine, plan(), &common::rules(&["-all"]));
    let optimized = common::results(&engine, plan(), &QueryOptions::default());
    assert_eq!(baseline.len(), 5 * DOCUMENTS);
    assert_same_rows(&baseline, &optimized, "interchange");
}

#[test]
fn test_collect_results_match_baseline() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        let vars = builder.collect(
            vec![("g", Expression::attribute_path(doc, "group"))],
            vec![
                ("n", AggregateFunction::Count, None),
                ("lo", AggregateFunction::Min, Some(Expression::attribute_path(doc, "value"))),
                ("hi", AggregateFunction::Max, Some(Expression::attribute_path(doc, "value"))),
            ],
            None,
        );
        builder.return_(Expression::array(vec![
            Expression::reference(vars.groups[0]),
            Expression::reference(vars.aggregates[0]),
            Expression::reference(vars.aggregates[1]),
            Expression::reference(vars.aggregates[2]),
        ]));
        builder.build().unwrap()
    };

    let rows = common::results(&engine, plan(), &QueryOptions::default());
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], json!([0, 25, 0, 8]));
    let baseline = common::results(&engine, plan(), &common::rules(&["-all"]));
    assert_eq!(baseline, rows);
}
