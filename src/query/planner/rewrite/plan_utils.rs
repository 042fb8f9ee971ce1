//! 规则共用的计划查询与修改辅助函数

use crate::core::types::expression::Expression;
use crate::core::types::{NodeId, VariableId};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType, WalkOrder};
use crate::query::planner::rewrite::result::{RewriteError, RewriteResult};

/// 产生变量的计算节点及其表达式
pub fn calculation_of(plan: &ExecutionPlan, variable: VariableId) -> Option<(NodeId, &Expression)> {
    let setter = plan.variable_setter(variable)?;
    match plan.kind(setter)? {
        PlanNodeKind::Calculation { expression, .. } => Some((setter, expression)),
        _ => None,
    }
}

/// 过滤节点的条件：(计算节点, 条件变量, 条件表达式)
pub fn filter_condition(plan: &ExecutionPlan, filter: NodeId) -> Option<(NodeId, VariableId, &Expression)> {
    let input = match plan.kind(filter)? {
        PlanNodeKind::Filter { input } => *input,
        _ => return None,
    };
    let (calc, expression) = calculation_of(plan, input)?;
    Some((calc, input, expression))
}

/// 计算节点的输出变量与表达式
pub fn calculation_parts(plan: &ExecutionPlan, calc: NodeId) -> Option<(VariableId, &Expression)> {
    match plan.kind(calc)? {
        PlanNodeKind::Calculation { out, expression } => Some((*out, expression)),
        _ => None,
    }
}

/// 读取变量的可达节点个数，子查询体内的节点也计入
pub fn usage_count(plan: &ExecutionPlan, variable: VariableId) -> usize {
    plan.walk_subqueries(WalkOrder::Dependency)
        .filter(|n| n.kind.variables_used().contains(&variable))
        .count()
}

/// 除 `except` 外是否还有节点读取变量
pub fn is_used_elsewhere(plan: &ExecutionPlan, variable: VariableId, except: NodeId) -> bool {
    plan.walk_subqueries(WalkOrder::Dependency)
        .any(|n| n.id != except && n.kind.variables_used().contains(&variable))
}

/// 替换计算节点的表达式
pub fn set_expression(plan: &mut ExecutionPlan, calc: NodeId, expression: Expression) -> RewriteResult<()> {
    match &mut plan.get_mut(calc)?.kind {
        PlanNodeKind::Calculation { expression: e, .. } => {
            *e = expression;
            Ok(())
        }
        other => Err(RewriteError::rewrite_failed(format!(
            "节点 {} 不是计算节点: {}",
            calc,
            other.node_type()
        ))),
    }
}

/// 计算节点的输出已无人读取且可以安全删除时删除它，返回是否删除
pub fn remove_calculation_if_unused(plan: &mut ExecutionPlan, calc: NodeId) -> RewriteResult<bool> {
    let Some((out, expression)) = calculation_parts(plan, calc) else {
        return Ok(false);
    };
    if usage_count(plan, out) > 0 || !expression.is_deterministic() || expression.can_throw() {
        return Ok(false);
    }
    plan.remove_node(calc)?;
    Ok(true)
}

/// `downstream` 到 `upstream` 之间的节点（不含两端，从下往上）
///
/// `upstream` 不在 `downstream` 的依赖链上时返回 `None`。
pub fn nodes_between(plan: &ExecutionPlan, upstream: NodeId, downstream: NodeId) -> Option<Vec<NodeId>> {
    let mut between = Vec::new();
    let mut current = plan.dependency(downstream);
    while let Some(id) = current {
        if id == upstream {
            return Some(between);
        }
        between.push(id);
        current = plan.dependency(id);
    }
    None
}

/// 同一条链上 `id` 下游的节点，直到（不含）第一个满足 `stop` 的节点
pub fn downstream_until<F>(plan: &ExecutionPlan, id: NodeId, stop: F) -> Vec<NodeId>
where
    F: Fn(PlanNodeType) -> bool,
{
    let mut result = Vec::new();
    let mut current = plan.dependent(id);
    while let Some(next) = current {
        match plan.node_type(next) {
            Some(t) if !stop(t) => result.push(next),
            _ => break,
        }
        current = plan.dependent(next);
    }
    result
}

/// 条件收集与索引覆盖分析的边界：行的集合在这些节点处被截断、聚合或送出
pub fn ends_filter_scope(node_type: PlanNodeType) -> bool {
    matches!(
        node_type,
        PlanNodeType::Limit | PlanNodeType::Collect | PlanNodeType::Return
    ) || node_type.is_modification()
        || node_type.is_cluster()
}
