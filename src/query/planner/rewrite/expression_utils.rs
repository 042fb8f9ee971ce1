//! 表达式工具函数
//!
//! 规则里反复用到的比较式拆解与字面量提取。

use crate::core::types::expression::Expression;
use crate::core::types::operators::ComparisonOperator;
use crate::core::value::values_equal;
use crate::core::Value;

/// 比较式的组成部分
#[derive(Debug, Clone, Copy)]
pub struct ComparisonParts<'a> {
    pub op: ComparisonOperator,
    pub left: &'a Expression,
    pub right: &'a Expression,
}

/// 拆开比较式
pub fn comparison_parts(expression: &Expression) -> Option<ComparisonParts<'_>> {
    match expression {
        Expression::Comparison { op, left, right } => Some(ComparisonParts {
            op: *op,
            left,
            right,
        }),
        _ => None,
    }
}

/// 把 `字面量 op 表达式` 统一成 `表达式 op' 字面量`
///
/// 返回 (表达式, 操作符, 字面量值)；两侧都不是字面量或操作符不可交换时返回 `None`。
pub fn compare_with_literal(expression: &Expression) -> Option<(&Expression, ComparisonOperator, &Value)> {
    let parts = comparison_parts(expression)?;
    if let Some(value) = parts.right.as_literal() {
        if parts.left.as_literal().is_none() {
            return Some((parts.left, parts.op, value));
        }
        return None;
    }
    let value = parts.left.as_literal()?;
    let op = parts.op.reverse()?;
    Some((parts.right, op, value))
}

/// 全部由字面量组成的数组，取出各元素的值
pub fn literal_array(expression: &Expression) -> Option<Vec<Value>> {
    match expression {
        Expression::Array { items } => items.iter().map(|i| i.as_literal().cloned()).collect(),
        Expression::Literal {
            value: Value::Array(items),
        } => Some(items.clone()),
        _ => None,
    }
}

/// 按 AQL 相等语义去重，保留第一次出现的顺序
pub fn dedup_values(values: Vec<Value>) -> Vec<Value> {
    let mut result: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !result.iter().any(|v| values_equal(v, &value)) {
            result.push(value);
        }
    }
    result
}

/// `RAND()` 调用
pub fn is_rand_call(expression: &Expression) -> bool {
    matches!(expression, Expression::FunctionCall { name, args } if name == "RAND" && args.is_empty())
}
