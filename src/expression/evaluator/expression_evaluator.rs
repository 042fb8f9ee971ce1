//! 表达式求值器实现
//!
//! 类型不匹配按 AQL 语义得到 null，不产生错误；除零得到 null 并记录警告。
//! 只有未知函数、参数个数不符、未绑定参数与函数主动抛错会返回错误。

use crate::core::error::{ErrorCode, ExpressionError};
use crate::core::types::expression::Expression;
use crate::core::types::operators::{LogicalOperator, UnaryOperator};
use crate::core::value::{
    arithmetic, get_attribute, number_value, to_bool, to_number, ArithmeticError,
};
use crate::core::{Value, Warning, WarningCollector};
use crate::expression::context::EmptyContext;
use crate::expression::evaluator::traits::ExpressionContext;
use crate::expression::functions;

/// 范围表达式最多展开的元素个数
const MAX_RANGE_ITEMS: f64 = 10_000_000.0;

/// 表达式求值器（unit struct，零开销）
#[derive(Debug)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    /// 在给定上下文中求值表达式
    pub fn evaluate<C: ExpressionContext + ?Sized>(
        expression: &Expression,
        context: &C,
        warnings: &mut WarningCollector,
    ) -> Result<Value, ExpressionError> {
        match expression {
            Expression::Literal { value } => Ok(value.clone()),
            Expression::BindParameter { name } => {
                Err(ExpressionError::missing_bind_parameter(name))
            }
            Expression::Reference { variable } => {
                Ok(context.get_variable(*variable).cloned().unwrap_or(Value::Null))
            }
            Expression::Attribute { base, name } => {
                let base = Self::evaluate(base, context, warnings)?;
                Ok(get_attribute(&base, name))
            }
            Expression::IndexedAccess { base, index } => {
                let base = Self::evaluate(base, context, warnings)?;
                let index = Self::evaluate(index, context, warnings)?;
                Ok(Self::indexed_access(&base, &index))
            }
            Expression::Unary { op, operand } => {
                let value = Self::evaluate(operand, context, warnings)?;
                Ok(match op {
                    UnaryOperator::Not => Value::Bool(!to_bool(&value)),
                    UnaryOperator::Minus => number_value(-to_number(&value)),
                    UnaryOperator::Plus => number_value(to_number(&value)),
                })
            }
            Expression::Arithmetic { op, left, right } => {
                let l = Self::evaluate(left, context, warnings)?;
                let r = Self::evaluate(right, context, warnings)?;
                match arithmetic(*op, &l, &r) {
                    Ok(value) => Ok(value),
                    Err(ArithmeticError::DivisionByZero) => {
                        warnings.push(Warning::new(
                            ErrorCode::QueryDivisionByZero,
                            "division by zero",
                        ));
                        Ok(Value::Null)
                    }
                }
            }
            Expression::Comparison { op, left, right } => {
                let l = Self::evaluate(left, context, warnings)?;
                let r = Self::evaluate(right, context, warnings)?;
                Ok(Value::Bool(op.evaluate(&l, &r)))
            }
            Expression::Logical { op, operands } => {
                // 短路求值，返回决定结果的那个操作数的值
                let mut last = Value::Null;
                for operand in operands {
                    last = Self::evaluate(operand, context, warnings)?;
                    let truthy = to_bool(&last);
                    match op {
                        LogicalOperator::And if !truthy => return Ok(last),
                        LogicalOperator::Or if truthy => return Ok(last),
                        _ => {}
                    }
                }
                Ok(last)
            }
            Expression::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if to_bool(&Self::evaluate(condition, context, warnings)?) {
                    Self::evaluate(then, context, warnings)
                } else {
                    Self::evaluate(otherwise, context, warnings)
                }
            }
            Expression::FunctionCall { name, args } => {
                let def = functions::lookup(name)
                    .ok_or_else(|| ExpressionError::unknown_function(name))?;
                let values = Self::evaluate_batch(args, context, warnings)?;
                def.call(&values, warnings)
            }
            Expression::Array { items } => {
                Ok(Value::Array(Self::evaluate_batch(items, context, warnings)?))
            }
            Expression::Object { attributes } => {
                let mut map = serde_json::Map::with_capacity(attributes.len());
                for (name, value) in attributes {
                    map.insert(name.clone(), Self::evaluate(value, context, warnings)?);
                }
                Ok(Value::Object(map))
            }
            Expression::Range { low, high } => {
                let low = to_number(&Self::evaluate(low, context, warnings)?).trunc();
                let high = to_number(&Self::evaluate(high, context, warnings)?).trunc();
                Ok(Self::range(low, high))
            }
        }
    }

    /// 批量求值表达式列表
    pub fn evaluate_batch<C: ExpressionContext + ?Sized>(
        expressions: &[Expression],
        context: &C,
        warnings: &mut WarningCollector,
    ) -> Result<Vec<Value>, ExpressionError> {
        let mut results = Vec::with_capacity(expressions.len());
        for expression in expressions {
            results.push(Self::evaluate(expression, context, warnings)?);
        }
        Ok(results)
    }

    /// 求值常量表达式，不访问任何变量
    pub fn evaluate_constant(
        expression: &Expression,
        warnings: &mut WarningCollector,
    ) -> Result<Value, ExpressionError> {
        Self::evaluate(expression, &EmptyContext, warnings)
    }

    /// 求值并转换为真值，用于过滤条件
    pub fn evaluate_condition<C: ExpressionContext + ?Sized>(
        expression: &Expression,
        context: &C,
        warnings: &mut WarningCollector,
    ) -> Result<bool, ExpressionError> {
        Ok(to_bool(&Self::evaluate(expression, context, warnings)?))
    }

    /// 常量表达式能否在优化期直接求值（确定性、不抛错、不含变量与绑定参数）
    pub fn can_fold(expression: &Expression) -> bool {
        expression.is_constant() && expression.is_deterministic() && !expression.can_throw()
    }

    fn indexed_access(base: &Value, index: &Value) -> Value {
        match (base, index) {
            (Value::Array(items), Value::Number(_)) => {
                let position = to_number(index).trunc() as i64;
                let len = items.len() as i64;
                let position = if position < 0 { len + position } else { position };
                if position < 0 || position >= len {
                    Value::Null
                } else {
                    items[position as usize].clone()
                }
            }
            (Value::Object(map), Value::String(key)) => {
                map.get(key).cloned().unwrap_or(Value::Null)
            }
            _ => Value::Null,
        }
    }

    fn range(low: f64, high: f64) -> Value {
        if (high - low).abs() > MAX_RANGE_ITEMS {
            return Value::Null;
        }
        let (low, high) = (low as i64, high as i64);
        let items: Vec<Value> = if low <= high {
            (low..=high).map(Value::from).collect()
        } else {
            (high..=low).rev().map(Value::from).collect()
        };
        Value::Array(items)
    }
}
