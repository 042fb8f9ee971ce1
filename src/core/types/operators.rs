//! 操作符类型定义
//!
//! 比较、逻辑与一元操作符。算术操作符定义在 `core::value::operations`。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::core::value::{compare_values, values_equal, Value};

pub use crate::core::value::ArithmeticOperator;

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::In => "in",
            ComparisonOperator::NotIn => "not in",
        }
    }

    /// 逻辑取反后的操作符，`!(a < b)` 等价于 `a >= b`
    pub fn negate(&self) -> ComparisonOperator {
        match self {
            ComparisonOperator::Eq => ComparisonOperator::Ne,
            ComparisonOperator::Ne => ComparisonOperator::Eq,
            ComparisonOperator::Lt => ComparisonOperator::Ge,
            ComparisonOperator::Le => ComparisonOperator::Gt,
            ComparisonOperator::Gt => ComparisonOperator::Le,
            ComparisonOperator::Ge => ComparisonOperator::Lt,
            ComparisonOperator::In => ComparisonOperator::NotIn,
            ComparisonOperator::NotIn => ComparisonOperator::In,
        }
    }

    /// 交换左右操作数后的操作符，`1 < a` 等价于 `a > 1`；IN 不可交换
    pub fn reverse(&self) -> Option<ComparisonOperator> {
        match self {
            ComparisonOperator::Eq => Some(ComparisonOperator::Eq),
            ComparisonOperator::Ne => Some(ComparisonOperator::Ne),
            ComparisonOperator::Lt => Some(ComparisonOperator::Gt),
            ComparisonOperator::Le => Some(ComparisonOperator::Ge),
            ComparisonOperator::Gt => Some(ComparisonOperator::Lt),
            ComparisonOperator::Ge => Some(ComparisonOperator::Le),
            ComparisonOperator::In | ComparisonOperator::NotIn => None,
        }
    }

    /// 是否为范围比较
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Lt
                | ComparisonOperator::Le
                | ComparisonOperator::Gt
                | ComparisonOperator::Ge
        )
    }

    /// 按 AQL 语义求值；右侧不是数组时 IN 为 false
    pub fn evaluate(&self, left: &Value, right: &Value) -> bool {
        match self {
            ComparisonOperator::Eq => values_equal(left, right),
            ComparisonOperator::Ne => !values_equal(left, right),
            ComparisonOperator::Lt => compare_values(left, right) == Ordering::Less,
            ComparisonOperator::Le => compare_values(left, right) != Ordering::Greater,
            ComparisonOperator::Gt => compare_values(left, right) == Ordering::Greater,
            ComparisonOperator::Ge => compare_values(left, right) != Ordering::Less,
            ComparisonOperator::In => match right {
                Value::Array(items) => items.iter().any(|item| values_equal(left, item)),
                _ => false,
            },
            ComparisonOperator::NotIn => !ComparisonOperator::In.evaluate(left, right),
        }
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        }
    }

    /// De Morgan 对偶操作符
    pub fn dual(&self) -> LogicalOperator {
        match self {
            LogicalOperator::And => LogicalOperator::Or,
            LogicalOperator::Or => LogicalOperator::And,
        }
    }
}

/// 一元操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
}

impl UnaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negate_is_involution() {
        for op in [
            ComparisonOperator::Eq,
            ComparisonOperator::Lt,
            ComparisonOperator::Ge,
            ComparisonOperator::In,
        ] {
            assert_eq!(op.negate().negate(), op);
        }
    }

    #[test]
    fn test_negated_operator_evaluates_opposite() {
        let values = [json!(null), json!(1), json!(2), json!("x"), json!([1])];
        let ops = [
            ComparisonOperator::Eq,
            ComparisonOperator::Ne,
            ComparisonOperator::Lt,
            ComparisonOperator::Le,
            ComparisonOperator::Gt,
            ComparisonOperator::Ge,
        ];
        for l in &values {
            for r in &values {
                for op in ops {
                    assert_ne!(op.evaluate(l, r), op.negate().evaluate(l, r));
                }
            }
        }
    }

    #[test]
    fn test_in_operator() {
        assert!(ComparisonOperator::In.evaluate(&json!(2), &json!([1, 2])));
        assert!(!ComparisonOperator::In.evaluate(&json!(2), &json!(2)));
        assert!(ComparisonOperator::NotIn.evaluate(&json!(3), &json!([1, 2])));
    }

    #[test]
    fn test_reverse() {
        assert_eq!(ComparisonOperator::Lt.reverse(), Some(ComparisonOperator::Gt));
        assert_eq!(ComparisonOperator::In.reverse(), None);
    }
}
