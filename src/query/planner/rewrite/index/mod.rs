//! 索引规则
//!
//! - 集合迭代加过滤条件改写为索引迭代 (`UseIndexesRule`)
//! - 按索引字段排序时用有序索引扫描代替排序 (`UseIndexForSortRule`)
//!
//! 被索引条件覆盖的过滤由 `elimination::RemoveFilterCoveredByIndexRule` 删除。

pub mod use_index_for_sort;
pub mod use_indexes;

pub use use_index_for_sort::UseIndexForSortRule;
pub use use_indexes::UseIndexesRule;

use crate::core::types::operators::ComparisonOperator;
use crate::index::{IndexCondition, IndexDescriptor};

/// 索引条件中从第一个字段开始连续等值约束的字段数
pub(crate) fn equality_prefix(index: &IndexDescriptor, condition: &IndexCondition) -> usize {
    index
        .field_paths()
        .iter()
        .take_while(|path| {
            condition
                .clauses
                .iter()
                .any(|c| &c.path == *path && c.op == ComparisonOperator::Eq)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::expression::Expression;
    use crate::index::{IndexClause, IndexType};

    #[test]
    fn test_equality_prefix() {
        let index = IndexDescriptor::new(
            "c/2",
            "c",
            IndexType::Persistent,
            vec!["a".into(), "b".into(), "c".into()],
        );
        let condition = IndexCondition::new(vec![
            IndexClause::new(vec!["a".into()], ComparisonOperator::Eq, Expression::literal(1)),
            IndexClause::new(vec!["b".into()], ComparisonOperator::Gt, Expression::literal(2)),
        ]);
        assert_eq!(equality_prefix(&index, &condition), 1);
        assert_eq!(equality_prefix(&index, &IndexCondition::default()), 0);
    }
}
