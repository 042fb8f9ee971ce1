//! 索引选择规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateCollection(doc IN c)
//!       |
//!   Calculation(t = doc.value == 3)
//!       |
//!   Filter(t)
//! ```
//!
//! After:
//! ```text
//!   Index(doc IN c, value == 3)
//!       |
//!   Calculation(t = doc.value == 3)
//!       |
//!   Filter(t)
//! ```
//!
//! 可用的条件形如 `doc.attr op value`，`op` 为 `== < <= > >= IN`，`value` 确定、不抛错、
//! 不引用 `doc`，且只引用集合迭代之前已产生的变量。
//!
//! 匹配方式按索引类型区分：
//! - 有序索引（primary、skiplist、persistent）取连续等值前缀，再加下一个字段上的范围条件
//! - hash 索引要求每个字段都有等值条件
//! - edge 索引至少一个字段有等值条件
//! - 稀疏索引要求每个字段都有非 null 字面量的 `==` 条件
//!
//! 多个索引可用时取覆盖子句最多的，其次选择性最高的，再次注册顺序靠前的；
//! 其余可用索引各自派生一个候选计划。过滤本身保留，由覆盖规则删除。

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::core::types::expression::Expression;
use crate::core::types::operators::ComparisonOperator;
use crate::core::types::{NodeId, VariableId};
use crate::define_rewrite_rule;
use crate::expression::condition;
use crate::index::{IndexClause, IndexCondition, IndexDescriptor, IndexType};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::expression_utils::comparison_parts;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{downstream_until, ends_filter_scope, filter_condition};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

const EQUALITY_OPS: [ComparisonOperator; 2] = [ComparisonOperator::Eq, ComparisonOperator::In];
const RANGE_OPS: [ComparisonOperator; 4] = [
    ComparisonOperator::Lt,
    ComparisonOperator::Le,
    ComparisonOperator::Gt,
    ComparisonOperator::Ge,
];

define_rewrite_rule! {
    /// 用索引迭代代替带过滤条件的集合迭代
    name: UseIndexesRule,
    rule_name: "use-indexes",
    pattern: Pattern::new_with_type(PlanNodeType::EnumerateCollection).and_type(PlanNodeType::Filter),
    apply: use_indexes
}

/// 一个可用索引及其条件
#[derive(Debug, Clone)]
struct Candidate {
    index: IndexDescriptor,
    condition: IndexCondition,
    position: usize,
}

impl Candidate {
    /// 越好的排在越前面
    fn rank(&self, other: &Self) -> Ordering {
        other
            .condition
            .clauses
            .len()
            .cmp(&self.condition.clauses.len())
            .then_with(|| {
                other
                    .index
                    .selectivity_estimate
                    .partial_cmp(&self.index.selectivity_estimate)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.position.cmp(&other.position))
    }
}

fn value_usable(value: &Expression, variable: VariableId, visible: &HashSet<VariableId>) -> bool {
    value.is_deterministic()
        && !value.can_throw()
        && !value.references(variable)
        && value.variables().iter().all(|v| visible.contains(v))
}

fn attribute_of(expression: &Expression, variable: VariableId) -> Option<Vec<String>> {
    match expression.attribute_access() {
        Some((v, path)) if v == variable && !path.is_empty() => Some(path),
        _ => None,
    }
}

/// 把一个合取项转成 `variable` 上的索引子句
fn extract_clause(
    expression: &Expression,
    variable: VariableId,
    visible: &HashSet<VariableId>,
) -> Option<IndexClause> {
    let parts = comparison_parts(expression)?;
    if !EQUALITY_OPS.contains(&parts.op) && !RANGE_OPS.contains(&parts.op) {
        return None;
    }
    if let Some(path) = attribute_of(parts.left, variable) {
        if value_usable(parts.right, variable, visible) {
            return Some(IndexClause::new(path, parts.op, parts.right.clone()));
        }
    }
    let reversed = parts.op.reverse()?;
    let path = attribute_of(parts.right, variable)?;
    if value_usable(parts.left, variable, visible) {
        return Some(IndexClause::new(path, reversed, parts.left.clone()));
    }
    None
}

/// 集合迭代下游过滤中可交给索引的子句
fn collect_clauses(plan: &ExecutionPlan, scan: NodeId, variable: VariableId) -> Vec<IndexClause> {
    let visible = plan.variables_visible_at(scan);
    let mut clauses = Vec::new();
    for id in downstream_until(plan, scan, ends_filter_scope) {
        if plan.node_type(id) != Some(PlanNodeType::Filter) {
            continue;
        }
        let Some((_, _, expression)) = filter_condition(plan, id) else {
            continue;
        };
        for part in condition::conjuncts(expression) {
            if let Some(clause) = extract_clause(&part, variable, &visible) {
                if !clauses.contains(&clause) {
                    clauses.push(clause);
                }
            }
        }
    }
    clauses
}

/// 索引能使用的子句；索引不可用时返回 `None`
pub(crate) fn match_index(index: &IndexDescriptor, clauses: &[IndexClause]) -> Option<IndexCondition> {
    if !index.index_type.supports_equality() {
        return None;
    }
    let on_field = |path: &[String], ops: &[ComparisonOperator]| -> Vec<IndexClause> {
        clauses
            .iter()
            .filter(|c| c.path.as_slice() == path && ops.contains(&c.op))
            .cloned()
            .collect()
    };

    let mut selected = Vec::new();
    if index.sparse {
        for field in index.field_paths() {
            let equal: Vec<IndexClause> = on_field(&field, &[ComparisonOperator::Eq])
                .into_iter()
                .filter(|c| c.value.as_literal().map(|v| !v.is_null()).unwrap_or(false))
                .collect();
            if equal.is_empty() {
                return None;
            }
            selected.extend(equal);
        }
    } else if index.index_type.is_sorted() {
        for field in index.field_paths() {
            let equal = on_field(&field, &EQUALITY_OPS);
            if !equal.is_empty() {
                selected.extend(equal);
                continue;
            }
            selected.extend(on_field(&field, &RANGE_OPS));
            break;
        }
    } else {
        match index.index_type {
            IndexType::Hash => {
                for field in index.field_paths() {
                    let equal = on_field(&field, &EQUALITY_OPS);
                    if equal.is_empty() {
                        return None;
                    }
                    selected.extend(equal);
                }
            }
            IndexType::Edge => {
                for field in index.field_paths() {
                    selected.extend(on_field(&field, &EQUALITY_OPS));
                }
            }
            _ => return None,
        }
    }

    if selected.is_empty() {
        None
    } else {
        Some(IndexCondition::new(selected))
    }
}

fn candidates(indexes: Vec<IndexDescriptor>, clauses: &[IndexClause]) -> Vec<Candidate> {
    let mut result: Vec<Candidate> = indexes
        .into_iter()
        .enumerate()
        .filter_map(|(position, index)| {
            let condition = match_index(&index, clauses)?;
            Some(Candidate {
                index,
                condition,
                position,
            })
        })
        .collect();
    result.sort_by(|a, b| a.rank(b));
    result
}

/// 按选择把集合迭代替换成索引迭代
fn apply_choices(plan: &ExecutionPlan, choices: &[(NodeId, &Candidate)]) -> RewriteResult<ExecutionPlan> {
    let mut result = plan.clone();
    for (scan, candidate) in choices {
        let (collection, out) = match result.kind(*scan) {
            Some(PlanNodeKind::EnumerateCollection { collection, out, .. }) => (collection.clone(), *out),
            _ => continue,
        };
        let node = result.create_node(
            PlanNodeKind::Index {
                collection,
                out,
                index: candidate.index.clone(),
                condition: candidate.condition.clone(),
                reverse: false,
                ordered: Vec::new(),
            },
            None,
        )?;
        result.replace_node(*scan, node)?;
    }
    Ok(result)
}

fn use_indexes(ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut chosen: Vec<(NodeId, Candidate)> = Vec::new();
    let mut others: Vec<(NodeId, Candidate)> = Vec::new();

    for scan in plan.find_nodes(PlanNodeType::EnumerateCollection) {
        let (collection, out) = match plan.kind(scan) {
            Some(PlanNodeKind::EnumerateCollection {
                collection,
                out,
                random: false,
            }) => (collection.clone(), *out),
            _ => continue,
        };
        let clauses = collect_clauses(plan, scan, out);
        if clauses.is_empty() {
            continue;
        }
        let mut ranked = candidates(ctx.indexes(&collection)?, &clauses).into_iter();
        let Some(best) = ranked.next() else {
            continue;
        };
        log::debug!(
            "use-indexes picked {} for scan {} ({} clauses)",
            best.index.id,
            scan,
            best.condition.clauses.len()
        );
        chosen.push((scan, best));
        others.extend(ranked.map(|c| (scan, c)));
    }

    if chosen.is_empty() {
        return Ok(TransformResult::unchanged());
    }
    let best: Vec<(NodeId, &Candidate)> = chosen.iter().map(|(s, c)| (*s, c)).collect();
    let main = apply_choices(plan, &best)?;

    let mut alternatives = Vec::with_capacity(others.len());
    for (scan, candidate) in &others {
        let choices: Vec<(NodeId, &Candidate)> = best
            .iter()
            .map(|(s, c)| if s == scan { (*s, candidate) } else { (*s, *c) })
            .collect();
        alternatives.push(apply_choices(plan, &choices)?);
    }
    Ok(TransformResult::with_alternatives(main, alternatives))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexOptions;
    use crate::query::planner::plan::PlanBuilder;
    use crate::query::planner::rewrite::rule::RewriteRule;
    use crate::storage::{CollectionType, MemoryStorage, StorageClient};
    use serde_json::json;
    use std::sync::Arc;

    fn storage() -> Arc<MemoryStorage> {
        let storage = MemoryStorage::new();
        storage.create_collection("c", CollectionType::Document).unwrap();
        let docs = (0..20)
            .map(|i| json!({"value": i % 4, "a": i, "b": i % 2}))
            .collect();
        storage.insert_documents("c", docs).unwrap();
        Arc::new(storage)
    }

    fn index_condition(plan: &ExecutionPlan) -> Option<(String, IndexCondition)> {
        let node = plan.find_nodes(PlanNodeType::Index).into_iter().next()?;
        match plan.kind(node) {
            Some(PlanNodeKind::Index { index, condition, .. }) => Some((index.id.clone(), condition.clone())),
            _ => None,
        }
    }

    #[test]
    fn test_equality_uses_persistent_index() {
        let storage = storage();
        let index = storage.ensure_index("c", IndexOptions::persistent(&["value"])).unwrap();

        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(3)));
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let mut ctx = RewriteContext::with_storage(storage);
        let result = UseIndexesRule::new().apply(&mut ctx, &plan).unwrap();
        assert!(result.changed);
        let plan = &result.plans[0];
        plan.validate().unwrap();
        assert!(!plan.contains_node_type(PlanNodeType::EnumerateCollection));
        assert!(plan.contains_node_type(PlanNodeType::Filter));
        let (id, condition) = index_condition(plan).unwrap();
        assert_eq!(id, index.id);
        assert_eq!(condition.to_string(), "value == 3");

        let again = UseIndexesRule::new().apply(&mut ctx, plan).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_most_clauses_wins_and_others_fork() {
        let storage = storage();
        storage.ensure_index("c", IndexOptions::hash(&["a"])).unwrap();
        let combined = storage
            .ensure_index("c", IndexOptions::persistent(&["a", "b"]))
            .unwrap();

        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::and(
            Expression::eq(Expression::attribute_path(doc, "a"), Expression::literal(1)),
            Expression::eq(Expression::literal(1), Expression::attribute_path(doc, "b")),
        ));
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let result = UseIndexesRule::new()
            .apply(&mut RewriteContext::with_storage(storage), &plan)
            .unwrap();
        assert_eq!(result.plans.len(), 2);
        let (id, condition) = index_condition(&result.plans[0]).unwrap();
        assert_eq!(id, combined.id);
        assert_eq!(condition.to_string(), "a == 1 && b == 1");
        let (_, alternative) = index_condition(&result.plans[1]).unwrap();
        assert_eq!(alternative.to_string(), "a == 1");
    }

    #[test]
    fn test_range_and_outer_variable() {
        let storage = storage();
        storage.ensure_index("c", IndexOptions::persistent(&["value"])).unwrap();

        let mut builder = PlanBuilder::new();
        let x = builder.for_list(
            Expression::array(vec![Expression::literal(1), Expression::literal(2)]),
            "x",
        );
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::lt(Expression::attribute_path(doc, "value"), Expression::reference(x)));
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let result = UseIndexesRule::new()
            .apply(&mut RewriteContext::with_storage(storage), &plan)
            .unwrap();
        let (_, condition) = index_condition(&result.plans[0]).unwrap();
        assert_eq!(condition.clauses[0].op, ComparisonOperator::Lt);
        assert_eq!(condition.variables(), vec![x]);
    }

    #[test]
    fn test_unusable_conditions() {
        let storage = storage();
        storage
            .ensure_index("c", IndexOptions::persistent(&["value"]).sparse())
            .unwrap();

        let mut builder = PlanBuilder::new();
        let doc = builder.for_collection("c", "doc");
        builder.filter(Expression::and(
            Expression::compare(
                Expression::attribute_path(doc, "value"),
                ComparisonOperator::Ne,
                Expression::literal(3),
            ),
            Expression::lt(Expression::attribute_path(doc, "value"), Expression::literal(2)),
        ));
        builder.return_(Expression::reference(doc));
        let plan = builder.build().unwrap();

        let result = UseIndexesRule::new()
            .apply(&mut RewriteContext::with_storage(storage), &plan)
            .unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_match_index_by_type() {
        let doc_value = |op| IndexClause::new(vec!["value".into()], op, Expression::literal(1));
        let hash = IndexDescriptor::new("c/2", "c", IndexType::Hash, vec!["value".into(), "b".into()]);
        assert!(match_index(&hash, &[doc_value(ComparisonOperator::Eq)]).is_none());

        let edge = IndexDescriptor::edge("e");
        let from = IndexClause::new(vec!["_from".into()], ComparisonOperator::Eq, Expression::literal("v/1"));
        assert_eq!(match_index(&edge, &[from]).map(|c| c.clauses.len()), Some(1));

        let skiplist = IndexDescriptor::new("c/3", "c", IndexType::Skiplist, vec!["value".into()]);
        let condition = match_index(
            &skiplist,
            &[doc_value(ComparisonOperator::Gt), doc_value(ComparisonOperator::Le)],
        )
        .unwrap();
        assert_eq!(condition.clauses.len(), 2);

        let fulltext = IndexDescriptor::new("c/4", "c", IndexType::Fulltext, vec!["value".into()]);
        assert!(match_index(&fulltext, &[doc_value(ComparisonOperator::Eq)]).is_none());
    }
}
