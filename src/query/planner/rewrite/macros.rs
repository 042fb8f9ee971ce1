//! 重写规则宏定义
//!
//! 提供声明式宏用于简化重写规则的定义，减少样板代码。

/// 定义无状态重写规则
///
/// 自动生成规则结构体、Default 实现、new() 方法和 RewriteRule trait 实现，
/// 规则逻辑是一个 `fn(&mut RewriteContext, &ExecutionPlan) -> RewriteResult<TransformResult>`。
///
/// # 示例
/// ```rust,ignore
/// define_rewrite_rule! {
///     /// 什么都不做
///     name: NoopRule,
///     rule_name: "noop",
///     pattern: Pattern::new_with_type(PlanNodeType::Filter),
///     apply: |_ctx, _plan| Ok(TransformResult::unchanged())
/// }
/// ```
#[macro_export]
macro_rules! define_rewrite_rule {
    (
        $(#[$meta:meta])*
        name: $name:ident,
        rule_name: $rule_name:expr,
        pattern: $pattern:expr,
        apply: $apply:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl $name {
            /// 创建规则实例
            pub fn new() -> Self {
                Self
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::query::planner::rewrite::rule::RewriteRule for $name {
            fn name(&self) -> &'static str {
                $rule_name
            }

            fn pattern(&self) -> $crate::query::planner::rewrite::pattern::Pattern {
                $pattern
            }

            fn apply(
                &self,
                ctx: &mut $crate::query::planner::rewrite::context::RewriteContext,
                plan: &$crate::query::planner::plan::ExecutionPlan,
            ) -> $crate::query::planner::rewrite::result::RewriteResult<
                $crate::query::planner::rewrite::result::TransformResult,
            > {
                let apply_fn: fn(
                    &mut $crate::query::planner::rewrite::context::RewriteContext,
                    &$crate::query::planner::plan::ExecutionPlan,
                ) -> $crate::query::planner::rewrite::result::RewriteResult<
                    $crate::query::planner::rewrite::result::TransformResult,
                > = $apply;
                apply_fn(ctx, plan)
            }
        }
    };
}
