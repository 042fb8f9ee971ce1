//! 选择性估计器模块
//!
//! 用于估算过滤条件与索引条件的选择性

use crate::core::types::expression::Expression;
use crate::core::types::operators::{ComparisonOperator, LogicalOperator, UnaryOperator};
use crate::core::value::to_bool;
use crate::index::{IndexCondition, IndexDescriptor};

use super::CostModelConfig;

/// 选择性估计器
#[derive(Debug, Clone, Copy)]
pub struct SelectivityEstimator {
    config: CostModelConfig,
}

impl SelectivityEstimator {
    /// 创建新的选择性估计器
    pub fn new(config: CostModelConfig) -> Self {
        Self { config }
    }

    /// 估计等值条件选择性
    pub fn estimate_equality_selectivity(&self) -> f64 {
        self.config.default_equality_selectivity
    }

    /// 估计范围条件选择性
    pub fn estimate_range_selectivity(&self) -> f64 {
        self.config.default_range_selectivity
    }

    /// `IN` 条件的选择性，列表长度已知时按元素个数放大
    pub fn estimate_in_selectivity(&self, list: &Expression) -> f64 {
        let members = match list {
            Expression::Array { items } => items.len(),
            Expression::Literal { value } => value.as_array().map(|a| a.len()).unwrap_or(1),
            _ => return self.config.default_filter_selectivity,
        };
        (members as f64 * self.estimate_equality_selectivity()).min(1.0)
    }

    /// 从表达式估计选择性
    pub fn estimate_from_expression(&self, expr: &Expression) -> f64 {
        match expr {
            Expression::Literal { value } => {
                if to_bool(value) {
                    1.0
                } else {
                    0.0
                }
            }
            Expression::Comparison { op, right, .. } => match op {
                ComparisonOperator::Eq => self.estimate_equality_selectivity(),
                ComparisonOperator::Ne => 1.0 - self.estimate_equality_selectivity(),
                ComparisonOperator::Lt
                | ComparisonOperator::Le
                | ComparisonOperator::Gt
                | ComparisonOperator::Ge => self.estimate_range_selectivity(),
                ComparisonOperator::In => self.estimate_in_selectivity(right),
                ComparisonOperator::NotIn => 1.0 - self.estimate_in_selectivity(right),
            },
            Expression::Logical { op, operands } => {
                let selectivities = operands.iter().map(|e| self.estimate_from_expression(e));
                match op {
                    LogicalOperator::And => selectivities.product(),
                    // P(a ∪ b) = 1 - Π(1 - P)
                    LogicalOperator::Or => 1.0 - selectivities.map(|s| 1.0 - s).product::<f64>(),
                }
            }
            Expression::Unary {
                op: UnaryOperator::Not,
                operand,
            } => 1.0 - self.estimate_from_expression(operand),
            _ => self.config.default_filter_selectivity,
        }
    }

    /// 一次索引查找命中的文档数
    ///
    /// 唯一索引上的全字段等值查找命中一条；非唯一索引的全字段等值查找按
    /// `1 / selectivity_estimate` 估算；其余情况逐子句乘以默认选择率。
    pub fn estimate_index_matches(
        &self,
        index: &IndexDescriptor,
        condition: &IndexCondition,
        collection_count: f64,
    ) -> f64 {
        if condition.is_empty() {
            return collection_count;
        }

        let mut fanout = 1.0;
        for clause in &condition.clauses {
            if clause.op == ComparisonOperator::In {
                fanout *= match &clause.value {
                    Expression::Array { items } => items.len().max(1) as f64,
                    Expression::Literal { value } => {
                        value.as_array().map(|a| a.len().max(1)).unwrap_or(1) as f64
                    }
                    _ => 10.0,
                };
            }
        }

        let all_fields_equal = index.field_paths().iter().all(|path| {
            condition.clauses.iter().any(|c| {
                &c.path == path
                    && matches!(c.op, ComparisonOperator::Eq | ComparisonOperator::In)
            })
        });
        if all_fields_equal {
            let per_key = if index.unique {
                1.0
            } else if index.selectivity_estimate > 0.0 {
                1.0 / index.selectivity_estimate
            } else {
                collection_count
            };
            return (per_key * fanout).min(collection_count);
        }

        let mut rows = collection_count;
        for clause in &condition.clauses {
            rows *= match clause.op {
                ComparisonOperator::Eq => self.estimate_equality_selectivity(),
                ComparisonOperator::In => self.estimate_in_selectivity(&clause.value),
                _ => self.estimate_range_selectivity(),
            };
        }
        rows
    }
}

impl Default for SelectivityEstimator {
    fn default() -> Self {
        Self::new(CostModelConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::VariableId;
    use crate::index::{IndexClause, IndexType};

    fn doc_value() -> Expression {
        Expression::attribute_path(VariableId(0), "value")
    }

    #[test]
    fn test_logical_combinations() {
        let estimator = SelectivityEstimator::default();
        let eq = Expression::eq(doc_value(), Expression::literal(1));
        let lt = Expression::lt(doc_value(), Expression::literal(5));

        let and = estimator.estimate_from_expression(&Expression::and(eq.clone(), lt.clone()));
        assert!((and - 0.1 * 0.333).abs() < 1e-9);

        let or = estimator.estimate_from_expression(&Expression::or(eq, lt));
        assert!(or > 0.333 && or < 0.433);

        assert_eq!(estimator.estimate_from_expression(&Expression::literal(false)), 0.0);
    }

    #[test]
    fn test_unique_index_lookup_matches_one() {
        let estimator = SelectivityEstimator::default();
        let primary = IndexDescriptor::primary("c");
        let condition = IndexCondition::new(vec![IndexClause::new(
            vec!["_key".to_string()],
            ComparisonOperator::Eq,
            Expression::literal("k1"),
        )]);
        assert_eq!(estimator.estimate_index_matches(&primary, &condition, 1000.0), 1.0);
        assert_eq!(
            estimator.estimate_index_matches(&primary, &IndexCondition::default(), 1000.0),
            1000.0
        );
    }

    #[test]
    fn test_range_lookup_uses_default_selectivity() {
        let estimator = SelectivityEstimator::default();
        let index = IndexDescriptor::new("c/2", "c", IndexType::Persistent, vec!["value".into()]);
        let condition = IndexCondition::new(vec![IndexClause::new(
            vec!["value".to_string()],
            ComparisonOperator::Gt,
            Expression::literal(3),
        )]);
        let matches = estimator.estimate_index_matches(&index, &condition, 1000.0);
        assert!((matches - 333.0).abs() < 1e-6);
    }
}
