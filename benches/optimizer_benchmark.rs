//! 优化器基准测试
//!
//! 运行: cargo bench --bench optimizer_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map};

use aql_optimizer::config::{ClusterConfig, Config, OptimizerConfig};
use aql_optimizer::core::types::expression::Expression;
use aql_optimizer::index::IndexOptions;
use aql_optimizer::query::optimizer::{Optimizer, QueryOptions};
use aql_optimizer::query::planner::plan::{ExecutionPlan, PlanBuilder};
use aql_optimizer::query::planner::rewrite::RewriteContext;
use aql_optimizer::query::QueryEngine;
use aql_optimizer::storage::{CollectionType, MemoryStorage, StorageClient};

fn create_storage(documents: usize) -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    storage
        .create_collection("bench", CollectionType::Document)
        .expect("Failed to create collection");
    let docs = (0..documents)
        .map(|i| json!({"_key": format!("k{}", i), "value": i % 100, "group": i % 7}))
        .collect();
    storage
        .insert_documents("bench", docs)
        .expect("Failed to insert documents");
    storage
        .ensure_index("bench", IndexOptions::persistent(&["value"]))
        .expect("Failed to create index");
    Arc::new(storage)
}

/// FOR doc IN bench FILTER doc.value == 42 && doc.group > 2 SORT doc.value LIMIT 10 RETURN doc
fn filter_sort_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("bench", "doc");
    builder.filter(Expression::and(
        Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(42)),
        Expression::gt(Expression::attribute_path(doc, "group"), Expression::literal(2)),
    ));
    builder.sort(vec![(Expression::attribute_path(doc, "value"), true)]);
    builder.limit(0, 10);
    builder.return_(Expression::reference(doc));
    builder.build().expect("Failed to build plan")
}

/// 两层嵌套枚举，触发排列阶段生成多个候选计划
fn nested_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(
        Expression::range(Expression::literal(1), Expression::literal(20)),
        "i",
    );
    let doc = builder.for_collection("bench", "doc");
    builder.filter(Expression::eq(
        Expression::attribute_path(doc, "value"),
        Expression::reference(i),
    ));
    builder.return_(Expression::reference(doc));
    builder.build().expect("Failed to build plan")
}

fn bench_optimize(c: &mut Criterion) {
    let storage = create_storage(1000);
    let mut group = c.benchmark_group("optimize");

    let single = Optimizer::from_config(&Config::default());
    group.bench_function("filter_sort_single_server", |b| {
        b.iter(|| {
            let mut ctx = RewriteContext::with_storage(storage.clone());
            let result = single
                .optimize(&mut ctx, filter_sort_plan(), &QueryOptions::default())
                .expect("optimize failed");
            black_box(result.plans.len())
        })
    });

    let cluster_config = Config {
        optimizer: OptimizerConfig {
            cluster: ClusterConfig::with_shards(3),
            ..Default::default()
        },
        ..Default::default()
    };
    let cluster = Optimizer::from_config(&cluster_config);
    group.bench_function("filter_sort_cluster", |b| {
        b.iter(|| {
            let mut ctx =
                RewriteContext::with_storage(storage.clone()).with_cluster(cluster_config.optimizer.cluster);
            let result = cluster
                .optimize(&mut ctx, filter_sort_plan(), &QueryOptions::default())
                .expect("optimize failed");
            black_box(result.plans.len())
        })
    });

    for max_plans in [1usize, 8, 128] {
        let options = QueryOptions::default().with_max_number_of_plans(max_plans);
        group.bench_with_input(BenchmarkId::new("nested_max_plans", max_plans), &options, |b, options| {
            b.iter(|| {
                let mut ctx = RewriteContext::with_storage(storage.clone());
                let result = single
                    .optimize(&mut ctx, nested_plan(), options)
                    .expect("optimize failed");
                black_box(result.plans.len())
            })
        });
    }

    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    for size in [1_000usize, 10_000] {
        let engine = QueryEngine::new(create_storage(size), Config::default());
        group.bench_with_input(BenchmarkId::new("filter_sort", size), &engine, |b, engine| {
            b.iter(|| {
                let result = engine
                    .execute(filter_sort_plan(), &Map::new(), &QueryOptions::default())
                    .expect("execute failed");
                black_box(result.json.len())
            })
        });

        let rules = QueryOptions::default().with_rules(&["-all"]);
        group.bench_with_input(BenchmarkId::new("filter_sort_unoptimized", size), &engine, |b, engine| {
            b.iter(|| {
                let result = engine
                    .execute(filter_sort_plan(), &Map::new(), &rules)
                    .expect("execute failed");
                black_box(result.json.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_optimize, bench_execute);
criterion_main!(benches);
