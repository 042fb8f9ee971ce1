//! 计算下移规则
//!
//! # 转换示例
//!
//! Before:
//! ```text
//!   EnumerateList(i)
//!       |
//!   Calculation(a = i + 1)
//!       |
//!   Calculation(t = i < 4)
//!       |
//!   Filter(t)
//!       |
//!   Return(a)
//! ```
//!
//! After:
//! ```text
//!   EnumerateList(i)
//!       |
//!   Calculation(t = i < 4)
//!       |
//!   Filter(t)
//!       |
//!   Calculation(a = i + 1)
//!       |
//!   Return(a)
//! ```
//!
//! 计算越过过滤、排序、限制与不读取它的子查询后，只对留下来的行执行。
//! 第一个读取者是 Collect 时不移动。

use crate::core::types::NodeId;
use crate::define_rewrite_rule;
use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::calculation_parts;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};

define_rewrite_rule! {
    /// 把确定性计算推迟到第一个读取它的节点之前
    name: MoveCalculationsDownRule,
    rule_name: "move-calculations-down",
    pattern: Pattern::new_with_type(PlanNodeType::Calculation),
    apply: move_calculations_down
}

/// 计算应移到其后的节点（最后一个被越过的过滤、排序、限制或子查询）
fn landing_point(plan: &ExecutionPlan, calc: NodeId) -> Option<NodeId> {
    let (out, expression) = calculation_parts(plan, calc)?;
    // 可能抛错的计算移过过滤后执行次数变少，错误会消失
    if !expression.is_deterministic() || expression.can_throw() {
        return None;
    }
    let mut last_barrier = None;
    let mut current = plan.dependent(calc);
    while let Some(id) = current {
        let node_type = plan.node_type(id)?;
        if plan.variables_used(id).contains(&out) {
            if node_type == PlanNodeType::Collect {
                return None;
            }
            break;
        }
        match node_type {
            PlanNodeType::Filter | PlanNodeType::Sort | PlanNodeType::Limit | PlanNodeType::Subquery => {
                last_barrier = Some(id);
            }
            PlanNodeType::Calculation => {}
            _ => break,
        }
        current = plan.dependent(id);
    }
    last_barrier
}

fn move_calculations_down(_ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
    let mut result = plan.clone();
    let mut changed = false;

    // 从下往上处理，先移动的计算不会挡住上游计算
    let mut calcs = plan.find_nodes(PlanNodeType::Calculation);
    calcs.reverse();
    for calc in calcs {
        let Some(barrier) = landing_point(&result, calc) else {
            continue;
        };
        let Some(next) = result.dependent(barrier) else {
            continue;
        };
        result.move_before(calc, next)?;
        changed = true;
    }
    Ok(TransformResult::from_plan(changed, result))
}
