//! 节点移动规则
//!
//! - 与循环变量无关的计算和过滤上移到循环之外 (`MoveCalculationsUpRule`, `MoveFiltersUpRule`)
//! - 计算下移到第一个读取它的节点之前，越过过滤、排序与限制 (`MoveCalculationsDownRule`)
//!
//! 上移只越过计算与循环节点，不越过过滤、排序与限制；下移正好停在最后一个被越过的
//! 过滤、排序、限制或子查询之后。两个方向因此不会来回拉扯同一个计算。

pub mod move_calculations_down;
pub mod move_calculations_up;
pub mod move_filters_up;

pub use move_calculations_down::MoveCalculationsDownRule;
pub use move_calculations_up::MoveCalculationsUpRule;
pub use move_filters_up::MoveFiltersUpRule;

use crate::core::types::{NodeId, VariableId};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind, PlanNodeType};

/// 从 `id` 向上查找能越过的最上面的循环节点
///
/// 只越过循环节点和满足 `can_cross` 的计算，遇到产生 `used` 中变量的节点即停止。
pub(crate) fn topmost_crossable_enumeration<F>(
    plan: &ExecutionPlan,
    id: NodeId,
    used: &[VariableId],
    can_cross: F,
) -> Option<NodeId>
where
    F: Fn(NodeId, &PlanNodeKind) -> bool,
{
    let mut topmost = None;
    let mut current = plan.dependency(id);
    while let Some(node_id) = current {
        let kind = plan.kind(node_id)?;
        if kind.variables_set().iter().any(|v| used.contains(v)) {
            break;
        }
        let node_type = kind.node_type();
        if node_type.is_enumeration() {
            topmost = Some(node_id);
        } else if node_type != PlanNodeType::Calculation || !can_cross(node_id, kind) {
            break;
        }
        current = plan.dependency(node_id);
    }
    topmost
}
