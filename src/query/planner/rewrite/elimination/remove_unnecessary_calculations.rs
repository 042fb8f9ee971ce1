//! 无用计算消除规则
//!
//! 输出变量没有任何节点读取（包括子查询体）的计算会被删除，前提是它确定性且不会抛错：
//! 删除一个可能抛错的计算会改变查询是否失败。
//!
//! 同一规则注册两次：`remove-unnecessary-calculations` 在早期清理归一化留下的临时计算，
//! `remove-unnecessary-calculations-2` 在后期清理排序与过滤被消除后剩下的计算。

use crate::query::planner::plan::{ExecutionPlan, PlanNodeType};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::plan_utils::remove_calculation_if_unused;
use crate::query::planner::rewrite::result::{RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::RewriteRule;

/// 删除结果无人读取的计算
#[derive(Debug, Clone, Copy)]
pub struct RemoveUnnecessaryCalculationsRule {
    name: &'static str,
}

impl RemoveUnnecessaryCalculationsRule {
    pub fn new() -> Self {
        Self {
            name: "remove-unnecessary-calculations",
        }
    }

    /// 后期 pass 中的第二个实例
    pub fn late() -> Self {
        Self {
            name: "remove-unnecessary-calculations-2",
        }
    }
}

impl Default for RemoveUnnecessaryCalculationsRule {
    fn default() -> Self {
        Self::new()
    }
}

impl RewriteRule for RemoveUnnecessaryCalculationsRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pattern(&self) -> Pattern {
        Pattern::new_with_type(PlanNodeType::Calculation)
    }

    fn apply(&self, _ctx: &mut RewriteContext, plan: &ExecutionPlan) -> RewriteResult<TransformResult> {
        let mut result = plan.clone();
        let mut changed = false;
        // 删除一个计算可能让它上游的计算也变得无用
        loop {
            let mut removed = false;
            for calc in result.find_nodes(PlanNodeType::Calculation) {
                removed |= remove_calculation_if_unused(&mut result, calc)?;
            }
            if !removed {
                break;
            }
            changed = true;
        }
        Ok(TransformResult::from_plan(changed, result))
    }
}
