//! 优化器集成测试
//!
//! 测试范围:
//! - 不同规则组合下结果一致
//! - 优化结果是不动点
//! - 规则开关与未知规则警告
//! - 规则互相撤销时的迭代上限
//! - 条件折叠与计算下移的具体场景

mod common;

use std::sync::Arc;

use serde_json::{json, Map};

use aql_optimizer::config::OptimizerConfig;
use aql_optimizer::core::types::expression::Expression;
use aql_optimizer::core::ToPublicError;
use aql_optimizer::query::optimizer::cost::CostModelConfig;
use aql_optimizer::query::optimizer::{Optimizer, QueryOptions};
use aql_optimizer::query::planner::plan::{
    AggregateFunction, ExecutionPlan, PlanBuilder, PlanNodeKind, PlanNodeType,
};
use aql_optimizer::query::planner::rewrite::{
    Pattern, RewriteContext, RewriteResult, RewriteRule, RuleRegistry, RulePass, TransformResult,
};

use common::assertions::{assert_rule_applied, assert_rule_not_applied, assert_same_rows};
use common::data_fixtures::standard_storage;

/// 各种规则组合，第一个是未优化的基线
const RULE_SETS: &[&[&str]] = &[
    &["-all"],
    &[],
    &["-all", "+use-indexes"],
    &["-all", "+use-indexes", "+remove-filter-covered-by-index"],
    &["-all", "+move-calculations-down"],
    &["-all", "+move-calculations-up", "+move-filters-up"],
    &["-all", "+simplify-conditions", "+split-filters", "+replace-or-with-in"],
    &["-use-indexes"],
    &["-remove-filter-covered-by-index"],
    &["-move-calculations-down", "-remove-unnecessary-calculations-2"],
];

/// FOR doc IN c FILTER doc.value == 3 && doc.group == 1 RETURN doc._key
fn equality_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::and(
        Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(3)),
        Expression::eq(Expression::attribute_path(doc, "group"), Expression::literal(1)),
    ));
    builder.return_(Expression::attribute_path(doc, "_key"));
    builder.build().unwrap()
}

/// FOR doc IN c FILTER doc.value == 1 || doc.value == 2 || doc.value > 8 RETURN doc.name
fn disjunction_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    let value = || Expression::attribute_path(doc, "value");
    builder.filter(Expression::or(
        Expression::or(
            Expression::eq(value(), Expression::literal(1)),
            Expression::eq(value(), Expression::literal(2)),
        ),
        Expression::gt(value(), Expression::literal(8)),
    ));
    builder.return_(Expression::attribute_path(doc, "name"));
    builder.build().unwrap()
}

/// FOR i IN 1..3 FOR doc IN c FILTER doc.value == i LET x = doc.group * 2 RETURN [i, x]
fn nested_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(3)), "i");
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::eq(
        Expression::attribute_path(doc, "value"),
        Expression::reference(i),
    ));
    let x = builder.let_(
        "x",
        Expression::arithmetic(
            Expression::attribute_path(doc, "group"),
            aql_optimizer::core::types::ArithmeticOperator::Multiply,
            Expression::literal(2),
        ),
    );
    builder.return_(Expression::array(vec![Expression::reference(i), Expression::reference(x)]));
    builder.build().unwrap()
}

/// FOR doc IN c COLLECT g = doc.group AGGREGATE n = COUNT() SORT g RETURN {g, n}
fn collect_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    builder.filter(Expression::lt(Expression::attribute_path(doc, "value"), Expression::literal(5)));
    let vars = builder.collect(
        vec![("g", Expression::attribute_path(doc, "group"))],
        vec![("n", AggregateFunction::Count, None)],
        None,
    );
    builder.sort(vec![(Expression::reference(vars.groups[0]), true)]);
    builder.return_(Expression::object(vec![
        ("g", Expression::reference(vars.groups[0])),
        ("n", Expression::reference(vars.aggregates[0])),
    ]));
    builder.build().unwrap()
}

/// FOR i IN 1..10 LET a = i + 1 FILTER i < 4 RETURN a
fn move_down_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(10)), "i");
    let a = builder.let_("a", Expression::add(Expression::reference(i), Expression::literal(1)));
    builder.filter(Expression::lt(Expression::reference(i), Expression::literal(4)));
    builder.return_(Expression::reference(a));
    builder.build().unwrap()
}

fn all_plans() -> Vec<(&'static str, ExecutionPlan)> {
    vec![
        ("equality", equality_plan()),
        ("disjunction", disjunction_plan()),
        ("nested", nested_plan()),
        ("collect", collect_plan()),
        ("move-down", move_down_plan()),
    ]
}

#[test]
fn test_results_equal_across_rule_sets() {
    let engine = common::engine(standard_storage());
    for (name, plan) in all_plans() {
        let baseline = common::results(&engine, plan.clone(), &common::rules(&["-all"]));
        for tokens in RULE_SETS {
            let actual = common::results(&engine, plan.clone(), &common::rules(tokens));
            assert_same_rows(&baseline, &actual, &format!("{} with {:?}", name, tokens));
        }
    }
}

/// FOR i IN 1..3 LET a = FAIL("boom") FILTER i > 100 RETURN a
fn failing_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(3)), "i");
    let a = builder.let_("a", Expression::function("FAIL", vec![Expression::literal("boom")]));
    builder.filter(Expression::gt(Expression::reference(i), Expression::literal(100)));
    builder.return_(Expression::reference(a));
    builder.build().unwrap()
}

/// FOR i IN 1..10 LET r = RAND() FILTER i > 5 LIMIT 2 RETURN [i, r]
fn random_plan() -> ExecutionPlan {
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(10)), "i");
    let r = builder.let_("r", Expression::function("RAND", vec![]));
    builder.filter(Expression::gt(Expression::reference(i), Expression::literal(5)));
    builder.limit(0, 2);
    builder.return_(Expression::array(vec![Expression::reference(i), Expression::reference(r)]));
    builder.build().unwrap()
}

#[test]
fn test_throwing_calculation_fails_under_every_rule_set() {
    let engine = common::engine(standard_storage());
    for tokens in RULE_SETS {
        let result = engine.execute(failing_plan(), &Map::new(), &common::rules(tokens));
        match result {
            Err(e) => assert_eq!(e.error_num(), 1569, "{:?}", tokens),
            Ok(r) => panic!("{:?} 应失败，实际结果 {:?}，规则 {:?}", tokens, r.json, r.plan.rules),
        }
    }
}

#[test]
fn test_random_calculation_rows_equal_across_rule_sets() {
    let engine = common::engine(standard_storage());
    for tokens in RULE_SETS {
        let rows = common::results(&engine, random_plan(), &common::rules(tokens));
        let keys: Vec<_> = rows.iter().map(|row| row[0].clone()).collect();
        assert_eq!(keys, vec![json!(6), json!(7)], "{:?}", tokens);
        assert!(rows.iter().all(|row| row[1].is_number()), "{:?}", tokens);
    }
}

#[test]
fn test_results_equal_in_cluster_mode() {
    let storage = standard_storage();
    let single = common::engine(storage.clone());
    let cluster = common::cluster_engine(storage, 3);
    for (name, plan) in all_plans() {
        let baseline = common::results(&single, plan.clone(), &common::rules(&["-all"]));
        let distributed = common::results(&cluster, plan, &QueryOptions::default());
        assert_same_rows(&baseline, &distributed, name);
    }
}

#[test]
fn test_every_candidate_plan_gives_same_result() {
    let engine = common::engine(standard_storage());
    let baseline = common::results(&engine, equality_plan(), &common::rules(&["-all"]));

    let optimizer = Optimizer::from_config(engine.config());
    let mut ctx = RewriteContext::with_storage(engine.storage().clone());
    let result = optimizer
        .optimize(&mut ctx, equality_plan(), &QueryOptions::default())
        .unwrap();
    // value 与 group 的索引各生成一个候选
    assert!(result.plans.len() >= 2);

    for candidate in result.plans {
        let pinned = common::engine(standard_storage());
        let actual = common::results(&pinned, candidate.plan, &common::rules(&["-all"]));
        assert_same_rows(&baseline, &actual, &format!("{:?}", candidate.applied_rules));
    }
}

#[test]
fn test_optimized_plan_is_fixpoint() {
    let engine = common::engine(standard_storage());
    let optimizer = Optimizer::from_config(engine.config());
    for (name, plan) in all_plans() {
        let mut ctx = RewriteContext::with_storage(engine.storage().clone());
        let first = optimizer
            .optimize(&mut ctx, plan, &QueryOptions::default())
            .unwrap()
            .into_best()
            .unwrap();

        let mut ctx = RewriteContext::with_storage(engine.storage().clone());
        let again = optimizer
            .optimize(&mut ctx, first.plan.clone(), &QueryOptions::default())
            .unwrap()
            .into_best()
            .unwrap();
        assert!(
            again.applied_rules.is_empty(),
            "{}: 再次优化仍应用了 {:?}",
            name,
            again.applied_rules
        );
        assert_eq!(again.plan.node_count(), first.plan.node_count(), "{}", name);
    }
}

#[test]
fn test_disabled_rule_never_reported() {
    let engine = common::engine(standard_storage());
    let registry = RuleRegistry::default();
    for name in registry.names() {
        let options = common::rules(&["-all", "+use-indexes", &format!("-{}", name)]);
        for (query, plan) in all_plans() {
            let explained = common::explain(&engine, plan, &options);
            assert_rule_not_applied(&explained.plan, name);
            for rule in &explained.plan.rules {
                assert!(
                    rule == "use-indexes",
                    "{}: 只启用了 use-indexes，却应用了 {}",
                    query,
                    rule
                );
            }
        }
    }
}

#[test]
fn test_all_rules_disabled_keeps_plan() {
    let engine = common::engine(standard_storage());
    let plan = equality_plan();
    let explained = common::explain(&engine, plan.clone(), &common::rules(&["-all"]));
    assert!(explained.plan.rules.is_empty());
    assert_eq!(explained.plan.nodes.len(), plan.node_count());
    assert!(explained.plan.find("EnumerateCollectionNode").is_some());
    assert!(explained.plan.find("IndexNode").is_none());
}

#[test]
fn test_unknown_rule_is_warning() {
    let engine = common::engine(standard_storage());
    let explained = common::explain(
        &engine,
        equality_plan(),
        &common::rules(&["-all", "+no-such-rule"]),
    );
    assert_eq!(explained.warnings.len(), 1);
    assert!(explained.plan.rules.is_empty());
}

#[test]
fn test_all_plans_returns_every_candidate() {
    let engine = common::engine(standard_storage());
    let options = QueryOptions::default().with_all_plans();
    let explained = common::explain(&engine, equality_plan(), &options);
    assert!(explained.plans.len() >= 2);
    assert_eq!(explained.plans[0].rules, explained.plan.rules);
    for pair in explained.plans.windows(2) {
        assert!(pair[0].estimated_cost <= pair[1].estimated_cost);
    }

    let single = common::explain(&engine, equality_plan(), &QueryOptions::default());
    assert!(single.plans.is_empty());
}

#[test]
fn test_max_number_of_plans_caps_candidates() {
    let engine = common::engine(standard_storage());
    let options = QueryOptions::default()
        .with_all_plans()
        .with_max_number_of_plans(1);
    let explained = common::explain(&engine, equality_plan(), &options);
    assert_eq!(explained.plans.len(), 1);
}

#[test]
fn test_move_calculations_down_scenario() {
    let engine = common::engine(standard_storage());
    let options = common::rules(&["-all", "+move-calculations-down"]);
    let explained = common::explain(&engine, move_down_plan(), &options);
    assert_rule_applied(&explained.plan, "move-calculations-down");
    assert_eq!(
        explained.plan.node_types(),
        vec![
            "SingletonNode",
            "CalculationNode",
            "EnumerateListNode",
            "CalculationNode",
            "FilterNode",
            "CalculationNode",
            "ReturnNode",
        ]
    );

    for tokens in [&["-all"][..], &["-all", "+move-calculations-down"][..], &[][..]] {
        let rows = common::results(&engine, move_down_plan(), &common::rules(tokens));
        assert_eq!(rows, vec![json!(2), json!(3), json!(4)], "{:?}", tokens);
    }
}

#[test]
fn test_calculation_feeding_collect_stays() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let i = builder.for_list(Expression::range(Expression::literal(1), Expression::literal(10)), "i");
    let a = builder.let_("a", Expression::add(Expression::reference(i), Expression::literal(1)));
    builder.filter(Expression::lt(Expression::reference(i), Expression::literal(4)));
    let vars = builder.collect(
        vec![],
        vec![("s", AggregateFunction::Sum, Some(Expression::reference(a)))],
        None,
    );
    builder.return_(Expression::reference(vars.aggregates[0]));
    let plan = builder.build().unwrap();

    let options = common::rules(&["-all", "+move-calculations-down"]);
    let explained = common::explain(&engine, plan.clone(), &options);
    assert_rule_not_applied(&explained.plan, "move-calculations-down");
    assert_eq!(common::results(&engine, plan, &options), vec![json!(9)]);
}

#[test]
fn test_condition_collapsing_preserves_operand_order() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    let eq = |attr: &str, n: i64| Expression::eq(Expression::attribute_path(doc, attr), Expression::literal(n));
    builder.filter(Expression::or(eq("b", 1), Expression::or(eq("a", 1), eq("b", 2))));
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let explained = common::explain(&engine, plan, &common::rules(&["-all", "+simplify-conditions"]));
    let calculation = explained.plan.find("CalculationNode").unwrap();
    let expression = calculation.detail("expression").unwrap();
    assert_eq!(expression["type"], "logical or");
    let left = &expression["subNodes"][0];
    let right = &expression["subNodes"][1];
    assert_eq!(left["type"], "compare ==");
    assert_eq!(left["subNodes"][0]["name"], "b");
    assert_eq!(left["subNodes"][1]["value"], 1);
    assert_eq!(right["type"], "logical or");
    assert_eq!(right["subNodes"][0]["subNodes"][0]["name"], "a");
    assert_eq!(right["subNodes"][1]["subNodes"][0]["name"], "b");
    assert_eq!(right["subNodes"][1]["subNodes"][1]["value"], 2);
}

#[test]
fn test_left_nested_conditions_are_collapsed() {
    let engine = common::engine(standard_storage());
    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("c", "doc");
    let eq = |attr: &str, n: i64| Expression::eq(Expression::attribute_path(doc, attr), Expression::literal(n));
    builder.filter(Expression::or(Expression::or(eq("a", 1), eq("b", 1)), eq("b", 2)));
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let explained = common::explain(&engine, plan, &common::rules(&["-all", "+simplify-conditions"]));
    assert_rule_applied(&explained.plan, "simplify-conditions");
    let expression = explained.plan.find("CalculationNode").unwrap().detail("expression").unwrap();
    assert_eq!(expression["subNodes"][0]["subNodes"][0]["name"], "a");
    assert_eq!(expression["subNodes"][1]["type"], "logical or");
}

/// 把所有排序改成指定方向
#[derive(Debug)]
struct ForceSortDirection {
    name: &'static str,
    ascending: bool,
}

impl RewriteRule for ForceSortDirection {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pattern(&self) -> Pattern {
        Pattern::new_with_type(PlanNodeType::Sort)
    }

    fn apply(&self, _ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
        let mut plan = plan.clone();
        let mut changed = false;
        for id in plan.find_nodes(PlanNodeType::Sort) {
            if let Some(PlanNodeKind::Sort { elements, .. }) = plan.node_mut(id).map(|n| &mut n.kind) {
                for element in elements.iter_mut().filter(|e| e.ascending != self.ascending) {
                    element.ascending = self.ascending;
                    changed = true;
                }
            }
        }
        Ok(TransformResult::from_plan(changed, plan))
    }
}

#[test]
fn test_fighting_rules_hit_iteration_limit() {
    let mut registry = RuleRegistry::default();
    registry
        .register_custom(ForceSortDirection { name: "force-asc", ascending: true }, RulePass::Late, true)
        .unwrap();
    registry
        .register_custom(ForceSortDirection { name: "force-desc", ascending: false }, RulePass::Late, true)
        .unwrap();
    let config = OptimizerConfig {
        max_iterations: 50,
        ..Default::default()
    };
    let optimizer = Optimizer::new(Arc::new(registry), config, CostModelConfig::default());
    let engine = common::engine(standard_storage()).with_optimizer(optimizer);

    let mut builder = PlanBuilder::new();
    let doc = builder.for_collection("d", "doc");
    builder.sort(vec![(Expression::attribute_path(doc, "ref"), false)]);
    builder.return_(Expression::reference(doc));
    let plan = builder.build().unwrap();

    let err = engine.explain(plan.clone(), &QueryOptions::default()).unwrap_err();
    assert_eq!(err.error_num(), 1590);

    // 关掉其中一条就能收敛
    let explained = common::explain(&engine, plan, &common::rules(&["-force-desc"]));
    assert_rule_applied(&explained.plan, "force-asc");
}

#[test]
fn test_duplicate_rule_name_rejected() {
    let mut registry = RuleRegistry::default();
    let err = registry
        .register_custom(
            ForceSortDirection { name: "use-indexes", ascending: true },
            RulePass::Late,
            true,
        )
        .unwrap_err();
    assert_eq!(err.error_code().as_i32(), 1591);
}
