//! 消除规则
//!
//! 删除不影响结果的节点，或把它们替换成更便宜的形式：
//! - 常量过滤 (`RemoveUnnecessaryFiltersRule`)
//! - 重复计算 (`RemoveRedundantCalculationsRule`)
//! - 结果无人读取的计算 (`RemoveUnnecessaryCalculationsRule`)
//! - 冗余排序 (`RemoveRedundantSortsRule`)
//! - `SORT RAND()` 改为随机迭代 (`RemoveSortRandRule`)
//! - 已被索引条件覆盖的过滤 (`RemoveFilterCoveredByIndexRule`)

pub mod remove_filter_covered_by_index;
pub mod remove_redundant_calculations;
pub mod remove_redundant_sorts;
pub mod remove_sort_rand;
pub mod remove_unnecessary_calculations;
pub mod remove_unnecessary_filters;

pub use remove_filter_covered_by_index::RemoveFilterCoveredByIndexRule;
pub use remove_redundant_calculations::RemoveRedundantCalculationsRule;
pub use remove_redundant_sorts::RemoveRedundantSortsRule;
pub use remove_sort_rand::RemoveSortRandRule;
pub use remove_unnecessary_calculations::RemoveUnnecessaryCalculationsRule;
pub use remove_unnecessary_filters::RemoveUnnecessaryFiltersRule;
