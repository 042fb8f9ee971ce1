//! 表达式上下文模块
//!
//! - `EmptyContext`：没有任何变量，用于常量折叠
//! - `MapContext`：按变量编号保存的稀疏变量表，用于规则里对单个表达式试算

use std::collections::HashMap;

use crate::core::types::VariableId;
use crate::core::Value;

pub use crate::expression::evaluator::traits::ExpressionContext;

/// 空上下文
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContext;

impl ExpressionContext for EmptyContext {
    fn get_variable(&self, _variable: VariableId) -> Option<&Value> {
        None
    }
}

/// 稀疏变量表上下文
#[derive(Debug, Default, Clone)]
pub struct MapContext {
    variables: HashMap<VariableId, Value>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_variable(&mut self, variable: VariableId, value: Value) {
        self.variables.insert(variable, value);
    }

    pub fn with_variable(mut self, variable: VariableId, value: Value) -> Self {
        self.set_variable(variable, value);
        self
    }
}

impl ExpressionContext for MapContext {
    fn get_variable(&self, variable: VariableId) -> Option<&Value> {
        self.variables.get(&variable)
    }
}
