//! 循环重排规则
//!
//! 相邻且互不依赖的循环可以任意交换嵌套顺序，结果集合不变（顺序可能不同，
//! 但没有 SORT 时顺序本来就没有保证）。每一种非原始顺序都作为新的候选计划，
//! 由代价模型挑选 (`InterchangeAdjacentEnumerationsRule`)。

pub mod interchange_adjacent_enumerations;

pub use interchange_adjacent_enumerations::InterchangeAdjacentEnumerationsRule;
