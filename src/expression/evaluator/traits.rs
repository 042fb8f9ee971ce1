//! 表达式上下文特征定义

use crate::core::types::VariableId;
use crate::core::Value;

/// 表达式上下文特征
///
/// 求值时按变量编号读取当前行中的变量值。
pub trait ExpressionContext {
    /// 获取变量值，变量尚未赋值时返回 `None`
    fn get_variable(&self, variable: VariableId) -> Option<&Value>;
}

/// 行数据按变量编号存放
impl ExpressionContext for [Value] {
    fn get_variable(&self, variable: VariableId) -> Option<&Value> {
        self.get(variable.index())
    }
}

impl ExpressionContext for Vec<Value> {
    fn get_variable(&self, variable: VariableId) -> Option<&Value> {
        self.get(variable.index())
    }
}
