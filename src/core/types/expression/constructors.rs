//! 表达式构造函数
//!
//! 提供创建各类表达式的工厂方法。

use crate::core::types::expression::Expression;
use crate::core::types::operators::{
    ArithmeticOperator, ComparisonOperator, LogicalOperator, UnaryOperator,
};
use crate::core::types::VariableId;
use crate::core::Value;

impl Expression {
    /// 创建字面量表达式
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal {
            value: value.into(),
        }
    }

    /// null 字面量
    pub fn null() -> Self {
        Expression::Literal { value: Value::Null }
    }

    /// 创建绑定参数表达式
    pub fn bind_parameter(name: impl Into<String>) -> Self {
        Expression::BindParameter { name: name.into() }
    }

    /// 创建变量引用表达式
    pub fn reference(variable: VariableId) -> Self {
        Expression::Reference { variable }
    }

    /// 创建属性访问表达式
    pub fn attribute(base: Expression, name: impl Into<String>) -> Self {
        Expression::Attribute {
            base: Box::new(base),
            name: name.into(),
        }
    }

    /// 按点分路径创建属性访问，`attribute_path(doc, "a.b")` 即 `doc.a.b`
    pub fn attribute_path(variable: VariableId, path: &str) -> Self {
        path.split('.')
            .fold(Expression::reference(variable), Expression::attribute)
    }

    /// 创建下标访问表达式
    pub fn indexed(base: Expression, index: Expression) -> Self {
        Expression::IndexedAccess {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// 创建一元运算表达式
    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// 逻辑非
    pub fn not(operand: Expression) -> Self {
        Expression::unary(UnaryOperator::Not, operand)
    }

    /// 创建算术运算表达式
    pub fn arithmetic(left: Expression, op: ArithmeticOperator, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 加法
    pub fn add(left: Expression, right: Expression) -> Self {
        Expression::arithmetic(left, ArithmeticOperator::Add, right)
    }

    /// 创建比较表达式
    pub fn compare(left: Expression, op: ComparisonOperator, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left == right`
    pub fn eq(left: Expression, right: Expression) -> Self {
        Expression::compare(left, ComparisonOperator::Eq, right)
    }

    /// `left < right`
    pub fn lt(left: Expression, right: Expression) -> Self {
        Expression::compare(left, ComparisonOperator::Lt, right)
    }

    /// `left > right`
    pub fn gt(left: Expression, right: Expression) -> Self {
        Expression::compare(left, ComparisonOperator::Gt, right)
    }

    /// 二元逻辑与
    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Logical {
            op: LogicalOperator::And,
            operands: vec![left, right],
        }
    }

    /// 二元逻辑或
    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Logical {
            op: LogicalOperator::Or,
            operands: vec![left, right],
        }
    }

    /// 三元运算
    pub fn ternary(condition: Expression, then: Expression, otherwise: Expression) -> Self {
        Expression::Ternary {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// 创建函数调用表达式，函数名转为大写
    pub fn function(name: &str, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.to_ascii_uppercase(),
            args,
        }
    }

    /// 创建数组字面量
    pub fn array(items: Vec<Expression>) -> Self {
        Expression::Array { items }
    }

    /// 创建对象字面量
    pub fn object(attributes: Vec<(&str, Expression)>) -> Self {
        Expression::Object {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// 创建范围表达式
    pub fn range(low: Expression, high: Expression) -> Self {
        Expression::Range {
            low: Box::new(low),
            high: Box::new(high),
        }
    }
}
