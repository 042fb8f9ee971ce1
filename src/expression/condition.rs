//! 条件归一化
//!
//! 把过滤条件整理成便于规则处理的形式：
//! - 同一操作符的嵌套 AND/OR 展平成多元节点，保持操作数顺序
//! - NOT 通过 De Morgan 定律下推，只在全部叶子都可取反时进行
//! - 只对布尔值表达式消去双重否定
//!
//! 归一化后的条件再由 `to_binary` 写回右折叠的二元树。

use std::mem;

use crate::core::types::expression::Expression;
use crate::core::types::operators::{LogicalOperator, UnaryOperator};
use crate::core::Value;

/// 归一化条件
pub fn normalize(expression: Expression) -> Expression {
    match expression {
        Expression::Logical { op, operands } => {
            let mut flattened = Vec::with_capacity(operands.len());
            for operand in operands {
                match normalize(operand) {
                    Expression::Logical {
                        op: inner_op,
                        operands: inner,
                    } if inner_op == op => flattened.extend(inner),
                    other => flattened.push(other),
                }
            }
            if flattened.len() == 1 {
                flattened.pop().unwrap_or_else(Expression::null)
            } else {
                Expression::Logical {
                    op,
                    operands: flattened,
                }
            }
        }
        Expression::Unary {
            op: UnaryOperator::Not,
            operand,
        } => {
            let inner = normalize(*operand);
            if is_negatable(&inner) {
                normalize(negate(inner))
            } else {
                Expression::not(inner)
            }
        }
        mut other => {
            for child in other.children_mut() {
                let taken = mem::replace(child, Expression::null());
                *child = normalize(taken);
            }
            other
        }
    }
}

/// 把多元逻辑节点写回右折叠的二元树：`[a, b, c]` → `a op (b op c)`
pub fn to_binary(expression: Expression) -> Expression {
    match expression {
        Expression::Logical { op, operands } => {
            let mut operands: Vec<Expression> = operands.into_iter().map(to_binary).collect();
            let Some(mut result) = operands.pop() else {
                return Expression::literal(op == LogicalOperator::And);
            };
            while let Some(left) = operands.pop() {
                result = Expression::Logical {
                    op,
                    operands: vec![left, result],
                };
            }
            result
        }
        mut other => {
            for child in other.children_mut() {
                let taken = mem::replace(child, Expression::null());
                *child = to_binary(taken);
            }
            other
        }
    }
}

/// 归一化后写回二元形式
pub fn collapse(expression: Expression) -> Expression {
    to_binary(normalize(expression))
}

/// 拆出顶层 AND 的各个合取项
pub fn conjuncts(expression: &Expression) -> Vec<Expression> {
    split(expression, LogicalOperator::And)
}

/// 拆出顶层 OR 的各个析取项
pub fn disjuncts(expression: &Expression) -> Vec<Expression> {
    split(expression, LogicalOperator::Or)
}

fn split(expression: &Expression, op: LogicalOperator) -> Vec<Expression> {
    match expression {
        Expression::Logical {
            op: expr_op,
            operands,
        } if *expr_op == op => operands.iter().flat_map(|o| split(o, op)).collect(),
        other => vec![other.clone()],
    }
}

/// 用右折叠的二元 AND 连接各项，空列表返回 `None`
pub fn conjunction(parts: Vec<Expression>) -> Option<Expression> {
    join(parts, LogicalOperator::And)
}

/// 用右折叠的二元 OR 连接各项，空列表返回 `None`
pub fn disjunction(parts: Vec<Expression>) -> Option<Expression> {
    join(parts, LogicalOperator::Or)
}

fn join(parts: Vec<Expression>, op: LogicalOperator) -> Option<Expression> {
    if parts.is_empty() {
        return None;
    }
    Some(to_binary(Expression::Logical { op, operands: parts }))
}

/// 能否在不改变语义的前提下取反后下推
fn is_negatable(expression: &Expression) -> bool {
    match expression {
        Expression::Comparison { .. } => true,
        Expression::Literal { value } => value.is_boolean(),
        Expression::Unary {
            op: UnaryOperator::Not,
            operand,
        } => operand.is_boolean_valued(),
        Expression::Logical { operands, .. } => operands.iter().all(is_negatable),
        _ => false,
    }
}

/// 取反，调用前须确认 `is_negatable`
fn negate(expression: Expression) -> Expression {
    match expression {
        Expression::Comparison { op, left, right } => Expression::Comparison {
            op: op.negate(),
            left,
            right,
        },
        Expression::Literal {
            value: Value::Bool(b),
        } => Expression::literal(!b),
        Expression::Unary {
            op: UnaryOperator::Not,
            operand,
        } => *operand,
        Expression::Logical { op, operands } => Expression::Logical {
            op: op.dual(),
            operands: operands.into_iter().map(negate).collect(),
        },
        other => Expression::not(other),
    }
}
