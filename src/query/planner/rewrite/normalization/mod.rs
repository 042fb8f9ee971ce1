//! 条件归一化规则
//!
//! 这些规则最先运行，把过滤条件整理成后续规则容易识别的形状：
//! - 嵌套的同类逻辑运算展平并写回右折叠形式 (`SimplifyConditionsRule`)
//! - 顶层 AND 拆成多个过滤节点 (`SplitFiltersRule`)
//! - 同一表达式与多个字面量的等值析取改写为 IN (`ReplaceOrWithInRule`)
//! - 同向范围比较的析取只保留最宽的一个 (`RemoveRedundantOrRule`)

pub mod remove_redundant_or;
pub mod replace_or_with_in;
pub mod simplify_conditions;
pub mod split_filters;

pub use remove_redundant_or::RemoveRedundantOrRule;
pub use replace_or_with_in::ReplaceOrWithInRule;
pub use simplify_conditions::SimplifyConditionsRule;
pub use split_filters::SplitFiltersRule;
