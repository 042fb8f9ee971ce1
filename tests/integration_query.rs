//! 查询执行集成测试
//!
//! 测试范围:
//! - explain / execute 的返回字段
//! - 错误码（errorNum）原样传递
//! - 游标分批与终止查询
//! - 子查询、图遍历、数据修改

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use aql_optimizer::core::types::expression::Expression;
use aql_optimizer::query::optimizer::QueryOptions;
use aql_optimizer::query::planner::plan::{ExecutionPlan, ModificationOptions, PlanBuilder};
use aql_optimizer::query::QueryStatus;
use aql_optimizer::storage::{CollectionType, Dataset, Direction, MemoryStorage, StorageClient};

use common::assertions::normalized;
use common::data_fixtures::{graph_storage, standard_storage, DOCUMENTS};

fn scan_plan(collection: &str) -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection(collection, "doc");
    builder.return_(Expression::attribute_path(doc, "_key"));
    builder.build().unwrap()
}

#[test]
fn test_explain_fields() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(1)));
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let explained = common::explain(&engine, plan, &QueryOptions::default());
    let value = serde_json::to_value(&explained).unwrap();
    let plan = &value["plan"];
    assert!(plan["nodes"].is_array());
    assert!(plan["rules"].is_array());
    assert!(plan["estimatedCost"].as_f64().unwrap() > 0.0);
    assert!(plan["estimatedNrItems"].is_u64());
    assert_eq!(plan["collections"][0]["name"], "c");
    assert_eq!(plan["collections"][0]["type"], "read");
    assert!(plan["variables"].as_array().unwrap().iter().any(|v| v["name"] == "doc"));
    assert!(value.get("plans").is_none());

    let first = &plan["nodes"][0];
    assert_eq!(first["type"], "SingletonNode");
    assert!(first["dependencies"].as_array().unwrap().is_empty());
    let index = plan["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["type"] == "IndexNode")
        .unwrap();
    assert_eq!(index["outVariable"]["name"], "doc");
    assert!(index["estimatedNrItems"].as_u64().unwrap() <= DOCUMENTS as u64);
}

#[test]
fn test_estimated_cost_prefers_index() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(1)));
        builder.return_(Expression::reference(doc));
        builder.build().unwrap()
    };
    let optimized = common::explain(&engine, plan(), &QueryOptions::default());
    let baseline = common::explain(&engine, plan(), &common::rules(&["-all"]));
    assert!(optimized.plan.estimated_cost < baseline.plan.estimated_cost);
}

#[test]
fn test_missing_collection_error_code() {
    let engine = common::engine(standard_storage());
    let err = engine
        .execute(scan_plan("missing"), &Map::new(), &QueryOptions::default())
        .unwrap_err();
    assert_eq!(err.error_num(), 1203);
}

#[test]
fn test_missing_bind_parameter_error_code() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::eq(Expression::attribute_path(doc, "value"), Expression::bind_parameter("v")));
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let err = engine.explain(plan, &QueryOptions::default()).unwrap_err();
    assert_eq!(err.error_num(), 1552);
}

#[test]
fn test_fail_function_error_code() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(Expression::array(vec![Expression::literal(1)]), "i");
    builder.return_(Expression::function(
        "FAIL",
        vec![Expression::function("CONCAT", vec![Expression::literal("boom"), Expression::reference(i)])],
    ));
    let plan = builder.build().unwrap();

    let err = engine.execute(plan, &Map::new(), &QueryOptions::default()).unwrap_err();
    assert_eq!(err.error_num(), 1569);
    assert!(engine.query_manager().running().is_empty());
    assert_eq!(engine.query_manager().stats().failed_queries, 1);
}

#[test]
fn test_non_array_loop_warns() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let x = builder.for_list(Expression::literal(5), "x");
    builder.return_(Expression::reference(x));
    let plan = builder.build().unwrap();

    let result = common::execute(&engine, plan, &common::rules(&["-all"]));
    assert!(result.json.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].code, 1563);
}

#[test]
fn test_cursor_batches() {
    let engine = common::engine(standard_storage());
    let options = QueryOptions::default().with_batch_size(30);
    let mut cursor = engine.cursor(scan_plan("c"), &Map::new(), &options).unwrap();
    assert_eq!(cursor.batch_size(), 30);

    let mut sizes = Vec::new();
    let mut all = Vec::new();
    while cursor.has_more() {
        let batch = cursor.next_batch().unwrap();
        if !batch.is_empty() {
            sizes.push(batch.len());
        }
        all.extend(batch);
    }
    assert_eq!(sizes, vec![30, 30, 30, 10]);
    assert_eq!(all.len(), DOCUMENTS);
    assert_eq!(cursor.stats().scanned_full, DOCUMENTS as u64);
    assert!(engine.query_manager().running().is_empty());
}

#[test]
fn test_kill_running_query() {
    let engine = common::engine(standard_storage());
    let options = QueryOptions::default().with_batch_size(10);
    let mut cursor = engine.cursor(scan_plan("c"), &Map::new(), &options).unwrap();
    assert_eq!(cursor.next_batch().unwrap().len(), 10);

    let running = engine.query_manager().running();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].status, QueryStatus::Running);
    assert!(engine.query_manager().kill_query(cursor.id().unwrap()));

    let err = cursor.next_batch().unwrap_err();
    assert_eq!(err.error_num(), 1500);
    assert!(engine.query_manager().running().is_empty());
    assert_eq!(engine.query_manager().stats().killed_queries, 1);
    assert!(!engine.query_manager().kill_query(999_999));
}

#[test]
fn test_full_count_ignores_limit() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::lt(Expression::attribute_path(doc, "value"), Expression::literal(5)));
    builder.limit(2, 5);
    builder.return_(Expression::attribute_path(doc, "_key"));
    let plan = builder.build().unwrap();

    let result = common::execute(&engine, plan, &QueryOptions::default().with_full_count());
    assert_eq!(result.json.len(), 5);
    assert_eq!(result.stats.full_count, Some(50));
}

#[test]
fn test_subquery_per_outer_row() {
    let engine = common::engine(standard_storage());
    let plan = || {
        let mut builder = PlanBuilder::new();
        let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(3)), "i");
        let sub = builder.subquery("sub", |b| {
            let j = b.for_list(Expression::range(Expression::literal(1), Expression::reference(i)), "j");
            b.return_(Expression::reference(j));
        });
        builder.return_(Expression::array(vec![
            Expression::reference(i),
            Expression::function("LENGTH", vec![Expression::reference(sub)]),
        ]));
        builder.build().unwrap()
    };

    for options in [QueryOptions::default(), common::rules(&["-all"])] {
        let rows = common::results(&engine, plan(), &options);
        assert_eq!(rows, vec![json!([1, 1]), json!([2, 2]), json!([3, 3])]);
    }
}

#[test]
fn test_traversal_and_shortest_path() {
    let engine = common::engine(graph_storage());

    let mut builder = PlanBuilder::new();
    let vars = builder.traversal(
        Expression::literal("v/a"),
        "e",
        Direction::Outbound,
        1..=2,
        "vertex",
        None,
        None,
    );
    builder.return_(Expression::attribute_path(vars.vertex, "_key"));
    let rows = common::results(&engine, builder.build().unwrap(), &QueryOptions::default());
    assert_eq!(
        normalized(&rows),
        normalized(&[json!("b"), json!("c"), json!("c"), json!("d")])
    );

    let mut builder = PlanBuilder::new();
    let (vertex, _) = builder.shortest_path(
        Expression::literal("v/a"),
        Expression::literal("v/d"),
        "e",
        Direction::Outbound,
        "vertex",
        None,
    );
    builder.return_(Expression::attribute_path(vertex, "_key"));
    let rows = common::results(&engine, builder.build().unwrap(), &QueryOptions::default());
    assert_eq!(rows, vec![json!("a"), json!("c"), json!("d")]);
}

fn insert_plan(keys: &[&str], options: ModificationOptions) -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let key = builder.for_list(
        Expression::array(keys.iter().map(|k| Expression::literal(*k)).collect()),
        "key",
    );
    let new = builder.insert(
        "d",
        Expression::object(vec![("_key", Expression::reference(key)), ("inserted", Expression::literal(true))]),
        options,
    );
    builder.return_(Expression::reference(new));
    builder.build().unwrap()
}

#[test]
fn test_insert_commits() {
    let storage = standard_storage();
    let engine = common::engine(storage.clone());
    let result = common::execute(&engine, insert_plan(&["n1", "n2"], ModificationOptions::default()), &QueryOptions::default());
    assert_eq!(result.json.len(), 2);
    assert_eq!(result.stats.writes_executed, 2);
    assert_eq!(result.json[0]["_id"], "d/n1");
    assert_eq!(storage.collection_count("d"), Ok(7));
    let collections = serde_json::to_value(&result.plan.collections).unwrap();
    assert_eq!(collections[0]["type"], "write");
}

#[test]
fn test_unique_violation_rolls_back() {
    let storage = standard_storage();
    let engine = common::engine(storage.clone());
    let err = engine
        .execute(insert_plan(&["n1", "d0"], ModificationOptions::default()), &Map::new(), &QueryOptions::default())
        .unwrap_err();
    assert_eq!(err.error_num(), 1210);
    assert_eq!(storage.collection_count("d"), Ok(5));
    assert_eq!(storage.document("d", "n1"), Ok(None));
}

#[test]
fn test_ignore_errors_skips_failed_writes() {
    let storage = standard_storage();
    let engine = common::engine(storage.clone());
    let options = ModificationOptions { ignore_errors: true };
    let result = common::execute(&engine, insert_plan(&["n1", "d0"], options), &QueryOptions::default());
    assert_eq!(result.stats.writes_executed, 1);
    assert_eq!(result.stats.writes_ignored, 1);
    assert_eq!(storage.collection_count("d"), Ok(6));
}

#[test]
fn test_update_and_remove() {
    let storage = standard_storage();
    let engine = common::engine(storage.clone());

    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("d", "doc");
    builder.filter(Expression::lt(Expression::attribute_path(doc, "ref"), Expression::literal(2)));
    let vars = builder.update(
        "d",
        Some(Expression::attribute_path(doc, "_key")),
        Expression::object(vec![("touched", Expression::literal(true))]),
        ModificationOptions::default(),
    );
    builder.return_(Expression::reference(vars.new.unwrap()));
    let result = common::execute(&engine, builder.build().unwrap(), &QueryOptions::default());
    assert_eq!(result.json.len(), 2);
    assert!(result.json.iter().all(|doc| doc["touched"] == json!(true)));
    assert_eq!(
        storage.document("d", "d0").unwrap().unwrap()["touched"],
        json!(true)
    );

    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("d", "doc");
    let old = builder.remove("d", Expression::attribute_path(doc, "_key"), ModificationOptions::default());
    builder.return_(Expression::attribute_path(old, "_key"));
    let result = common::execute(&engine, builder.build().unwrap(), &QueryOptions::default());
    assert_eq!(result.json.len(), 5);
    assert_eq!(result.stats.writes_executed, 5);
    assert_eq!(storage.collection_count("d"), Ok(0));
}

#[test]
fn test_queries_on_shared_engine_from_threads() {
    let engine = Arc::new(common::engine(standard_storage()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || common::results(&engine, scan_plan("c"), &QueryOptions::default()).len())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), DOCUMENTS);
    }
    assert_eq!(engine.query_manager().stats().finished_queries, 4);
}

#[test]
fn test_plan_and_dataset_from_json() {
    let dataset = Dataset::from_json(
        r#"{"collections": {"users": {
            "documents": [{"_key": "a", "age": 30}, {"_key": "b", "age": 40}],
            "indexes": [{"type": "persistent", "fields": ["age"]}]
        }}}"#,
    )
    .unwrap();
    let storage: MemoryStorage = dataset.into_storage(Duration::from_millis(100)).unwrap();
    let engine = common::engine(Arc::new(storage));

    let mut builder = PlanBuilder::new();
    let user = builder.for_collection("users", "u");
    builder.filter(Expression::gt(Expression::attribute_path(user, "age"), Expression::literal(35)));
    builder.return_(Expression::attribute_path(user, "_key"));
    let text = serde_json::to_string(&builder.build().unwrap()).unwrap();
    let plan: ExecutionPlan = serde_json::from_str(&text).unwrap();

    let rows: Vec<Value> = common::results(&engine, plan, &QueryOptions::default());
    assert_eq!(rows, vec![json!("b")]);
}

#[test]
fn test_edge_collection_required_for_traversal() {
    let storage = MemoryStorage::new();
    storage.create_collection("v", CollectionType::Document).unwrap();
    storage.insert_document("v", json!({"_key": "a"})).unwrap();
    let engine = common::engine(Arc::new(storage));

    let mut builder = PlanBuilder::new();
    let vars = builder.traversal(Expression::literal("v/a"), "v", Direction::Any, 1..=1, "x", None, None);
    builder.return_(Expression::reference(vars.vertex));
    let err = engine
        .execute(builder.build().unwrap(), &Map::new(), &QueryOptions::default())
        .unwrap_err();
    assert_eq!(err.error_num(), 1227);
}
