//! 用有序索引代替排序
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateCollection(doc IN c)
//!       |
//!   Calculation(t = doc.value)
//!       |
//!   Sort(t DESC)
//! ```
//!
//! After:
//! ```text
//!   Index(doc IN c, reverse)
//!       |
//!   Calculation(t = doc.value)
//! ```
//!
//! 排序条件必须都是同一个循环变量的属性访问，方向一致，并且与某个有序、非稀疏索引
//! 在等值前缀之后的字段依次相同。索引条件中有 IN 时不处理：IN 的多个值各自有序，
//! 合起来不保证有序。循环节点不能位于另一个循环之内。

use crate::core::types::operators::ComparisonOperator;
use crate::core::types::{NodeId, VariableId};
use crate::define_rewrite_rule;
use crate::index::{IndexCondition, IndexDescriptor};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType, SortPath};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::index::equality_prefix;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::{calculation_of, nodes_between};
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 排序字段与有序索引一致时删除排序，改为按索引顺序迭代
    name: UseIndexForSortRule,
    rule_name: "use-index-for-sort",
    pattern: Pattern::new_with_type(PlanNodeType::Sort)
        .and_any(vec![PlanNodeType::EnumerateCollection, PlanNodeType::Index]),
    apply: use_index_for_sort
}

/// 循环节点与排序之间允许出现的节点
fn is_order_preserving(node_type: PlanNodeType) -> bool {
    matches!(
        node_type,
        PlanNodeType::Calculation
            | PlanNodeType::Filter
            | PlanNodeType::Subquery
            | PlanNodeType::Remote
            | PlanNodeType::Gather
            | PlanNodeType::Scatter
    )
}

/// 排序条件对应的 (循环变量, 属性路径, 是否升序)
fn sort_paths(plan: &ExecutionPlan, sort: NodeId) -> Option<(VariableId, Vec<Vec<String>>, bool)> {
    let PlanNodeKind::Sort { elements, .. } = plan.kind(sort)? else {
        return None;
    };
    let ascending = elements.first()?.ascending;
    let mut variable = None;
    let mut paths = Vec::with_capacity(elements.len());
    for element in elements {
        if element.ascending != ascending {
            return None;
        }
        let (_, expression) = calculation_of(plan, element.variable)?;
        let (base, path) = expression.attribute_access()?;
        if path.is_empty() || variable.is_some_and(|v| v != base) {
            return None;
        }
        variable = Some(base);
        paths.push(path);
    }
    Some((variable?, paths, ascending))
}

/// 按索引顺序迭代能否得到要求的顺序
fn index_serves(index: &IndexDescriptor, condition: &IndexCondition, paths: &[Vec<String>]) -> bool {
    if !index.can_serve_sort() || condition.clauses.iter().any(|c| c.op == ComparisonOperator::In) {
        return false;
    }
    let fields = index.field_paths();
    let prefix = equality_prefix(index, condition);
    (0..=prefix).any(|start| {
        fields
            .get(start..start + paths.len())
            .map(|window| window == paths)
            .unwrap_or(false)
    })
}

fn process_sort(ctx: &mut RewriteContext, plan: &mut ExecutionPlan, sort: NodeId) -> RewriteResult<bool> {
    let Some((variable, paths, ascending)) = sort_paths(plan, sort) else {
        return Ok(false);
    };
    let Some(setter) = plan.variable_setter(variable) else {
        return Ok(false);
    };
    if plan.is_in_inner_loop(setter) {
        return Ok(false);
    }
    let Some(between) = nodes_between(plan, setter, sort) else {
        return Ok(false);
    };
    if between
        .iter()
        .any(|id| !plan.node_type(*id).map(is_order_preserving).unwrap_or(false))
    {
        return Ok(false);
    }

    let ordered: Vec<SortPath> = paths
        .iter()
        .map(|path| SortPath::new(variable, path.clone(), ascending))
        .collect();

    match plan.kind(setter).cloned() {
        Some(PlanNodeKind::EnumerateCollection {
            collection,
            out,
            random: false,
        }) => {
            let indexes = ctx.indexes(&collection)?;
            let empty = IndexCondition::default();
            let Some(index) = indexes.into_iter().find(|i| index_serves(i, &empty, &paths)) else {
                return Ok(false);
            };
            log::debug!("use-index-for-sort scans {} instead of sorting", index.id);
            let node = plan.create_node(
                PlanNodeKind::Index {
                    collection,
                    out,
                    index,
                    condition: empty,
                    reverse: !ascending,
                    ordered: ordered.clone(),
                },
                None,
            )?;
            plan.replace_node(setter, node)?;
        }
        Some(PlanNodeKind::Index { index, condition, .. }) => {
            if !index_serves(&index, &condition, &paths) {
                return Ok(false);
            }
            if let PlanNodeKind::Index {
                reverse,
                ordered: current,
                ..
            } = &mut plan.get_mut(setter)?.kind
            {
                *reverse = !ascending;
                *current = ordered.clone();
            }
        }
        _ => return Ok(false),
    }

    for id in between {
        if let PlanNodeKind::Gather { elements } = &mut plan.get_mut(id)?.kind {
            *elements = ordered.clone();
        }
    }
    plan.remove_node(sort)?;
    Ok(true)
}

fn use_index_for_sort(ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;
    for sort in plan.find_nodes(PlanNodeType::Sort) {
        if result.contains(sort) {
            changed |= process_sort(ctx, &mut result, sort)?;
        }
    }
    Ok(TransformResult::from_plan(changed, result))
}
