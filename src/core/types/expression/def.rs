//! 表达式类型定义
//!
//! 本模块定义 Calculation 节点使用的统一表达式类型 `Expression` 枚举。

use serde::{Deserialize, Serialize};

use crate::core::types::operators::{
    ArithmeticOperator, ComparisonOperator, LogicalOperator, UnaryOperator,
};
use crate::core::types::VariableId;
use crate::core::Value;

/// 统一表达式类型
///
/// 逻辑运算用操作数列表表示：构造时总是两个操作数（二元形式），
/// 条件归一化之后同一操作符的嵌套会被展平成多个操作数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    /// 字面量值
    Literal { value: Value },

    /// 绑定参数，查询开始前替换为字面量
    BindParameter { name: String },

    /// 变量引用
    Reference { variable: VariableId },

    /// 属性访问 `base.name`
    Attribute { base: Box<Expression>, name: String },

    /// 下标访问 `base[index]`
    IndexedAccess {
        base: Box<Expression>,
        index: Box<Expression>,
    },

    /// 一元运算
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// 算术运算
    Arithmetic {
        op: ArithmeticOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// 比较运算
    Comparison {
        op: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// 逻辑运算
    Logical {
        op: LogicalOperator,
        operands: Vec<Expression>,
    },

    /// 三元运算 `condition ? then : otherwise`
    Ternary {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },

    /// 函数调用，函数名统一大写
    FunctionCall { name: String, args: Vec<Expression> },

    /// 数组字面量
    Array { items: Vec<Expression> },

    /// 对象字面量
    Object { attributes: Vec<(String, Expression)> },

    /// 整数范围 `low..high`
    Range {
        low: Box<Expression>,
        high: Box<Expression>,
    },
}
