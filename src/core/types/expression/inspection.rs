//! 表达式检查方法
//!
//! 提供检查表达式属性（确定性、是否可能抛错、引用的变量）以及
//! 就地改写（变量替换、绑定参数替换）的方法。

use std::collections::{BTreeSet, HashMap};

use serde_json::Map;

use crate::core::error::ExpressionError;
use crate::core::types::expression::Expression;
use crate::core::types::operators::LogicalOperator;
use crate::core::types::VariableId;
use crate::core::Value;
use crate::expression::functions;

impl Expression {
    /// 直接子表达式
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal { .. }
            | Expression::BindParameter { .. }
            | Expression::Reference { .. } => Vec::new(),
            Expression::Attribute { base, .. } => vec![base.as_ref()],
            Expression::IndexedAccess { base, index } => vec![base.as_ref(), index.as_ref()],
            Expression::Unary { operand, .. } => vec![operand.as_ref()],
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expression::Logical { operands, .. } => operands.iter().collect(),
            Expression::Ternary {
                condition,
                then,
                otherwise,
            } => vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
            Expression::FunctionCall { args, .. } => args.iter().collect(),
            Expression::Array { items } => items.iter().collect(),
            Expression::Object { attributes } => attributes.iter().map(|(_, e)| e).collect(),
            Expression::Range { low, high } => vec![low.as_ref(), high.as_ref()],
        }
    }

    /// 可变的直接子表达式
    pub fn children_mut(&mut self) -> Vec<&mut Expression> {
        match self {
            Expression::Literal { .. }
            | Expression::BindParameter { .. }
            | Expression::Reference { .. } => Vec::new(),
            Expression::Attribute { base, .. } => vec![base.as_mut()],
            Expression::IndexedAccess { base, index } => vec![base.as_mut(), index.as_mut()],
            Expression::Unary { operand, .. } => vec![operand.as_mut()],
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            Expression::Logical { operands, .. } => operands.iter_mut().collect(),
            Expression::Ternary {
                condition,
                then,
                otherwise,
            } => vec![condition.as_mut(), then.as_mut(), otherwise.as_mut()],
            Expression::FunctionCall { args, .. } => args.iter_mut().collect(),
            Expression::Array { items } => items.iter_mut().collect(),
            Expression::Object { attributes } => {
                attributes.iter_mut().map(|(_, e)| e).collect()
            }
            Expression::Range { low, high } => vec![low.as_mut(), high.as_mut()],
        }
    }

    /// 表达式引用的全部变量
    pub fn variables(&self) -> BTreeSet<VariableId> {
        let mut result = BTreeSet::new();
        self.collect_variables(&mut result);
        result
    }

    fn collect_variables(&self, result: &mut BTreeSet<VariableId>) {
        if let Expression::Reference { variable } = self {
            result.insert(*variable);
        }
        for child in self.children() {
            child.collect_variables(result);
        }
    }

    /// 是否引用了指定变量
    pub fn references(&self, variable: VariableId) -> bool {
        match self {
            Expression::Reference { variable: v } => *v == variable,
            _ => self.children().iter().any(|c| c.references(variable)),
        }
    }

    /// 是否确定性：不含 RAND() 之类的非确定性函数，未知函数视为非确定性
    pub fn is_deterministic(&self) -> bool {
        if let Expression::FunctionCall { name, .. } = self {
            match functions::lookup(name) {
                Some(def) if def.deterministic => {}
                _ => return false,
            }
        }
        self.children().iter().all(|c| c.is_deterministic())
    }

    /// 求值时是否可能抛错
    pub fn can_throw(&self) -> bool {
        match self {
            Expression::BindParameter { .. } => true,
            Expression::FunctionCall { name, .. } => match functions::lookup(name) {
                Some(def) if !def.can_throw => self.children().iter().any(|c| c.can_throw()),
                _ => true,
            },
            _ => self.children().iter().any(|c| c.can_throw()),
        }
    }

    /// 常量表达式：不引用变量和绑定参数且确定性
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal { .. } => true,
            Expression::Reference { .. } | Expression::BindParameter { .. } => false,
            _ => self.is_deterministic() && self.children().iter().all(|c| c.is_constant()),
        }
    }

    /// 字面量值
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expression::Literal { value } => Some(value),
            _ => None,
        }
    }

    /// 直接引用的变量
    pub fn as_reference(&self) -> Option<VariableId> {
        match self {
            Expression::Reference { variable } => Some(*variable),
            _ => None,
        }
    }

    /// 纯属性访问 `var.a.b` 拆成 (变量, 路径)；直接引用得到空路径
    pub fn attribute_access(&self) -> Option<(VariableId, Vec<String>)> {
        match self {
            Expression::Reference { variable } => Some((*variable, Vec::new())),
            Expression::Attribute { base, name } => {
                let (variable, mut path) = base.attribute_access()?;
                path.push(name.clone());
                Some((variable, path))
            }
            _ => None,
        }
    }

    /// 是否为对指定函数的调用
    pub fn is_function_call(&self, function: &str) -> bool {
        matches!(self, Expression::FunctionCall { name, .. } if name == function)
    }

    /// 结果一定是布尔值（比较、逻辑非、只含布尔操作数的逻辑运算）
    pub fn is_boolean_valued(&self) -> bool {
        match self {
            Expression::Literal { value } => value.is_boolean(),
            Expression::Comparison { .. } => true,
            Expression::Unary { op, .. } => *op == crate::core::types::operators::UnaryOperator::Not,
            Expression::Logical { operands, .. } => operands.iter().all(|o| o.is_boolean_valued()),
            _ => false,
        }
    }

    /// 是否为指定操作符的逻辑运算
    pub fn is_logical(&self, op: LogicalOperator) -> bool {
        matches!(self, Expression::Logical { op: o, .. } if *o == op)
    }

    /// 节点总数，用于规则里比较表达式规模
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// 按映射替换变量引用，返回是否有改动
    pub fn replace_variables(&mut self, replacements: &HashMap<VariableId, VariableId>) -> bool {
        if let Expression::Reference { variable } = self {
            if let Some(target) = replacements.get(variable) {
                *variable = *target;
                return true;
            }
            return false;
        }
        let mut changed = false;
        for child in self.children_mut() {
            changed |= child.replace_variables(replacements);
        }
        changed
    }

    /// 把绑定参数替换为字面量
    pub fn bind_parameters(&mut self, bind_vars: &Map<String, Value>) -> Result<(), ExpressionError> {
        if let Expression::BindParameter { name } = self {
            let value = bind_vars
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| ExpressionError::missing_bind_parameter(name))?;
            *self = Expression::Literal { value };
            return Ok(());
        }
        for child in self.children_mut() {
            child.bind_parameters(bind_vars)?;
        }
        Ok(())
    }

    /// 收集所有绑定参数名
    pub fn bind_parameter_names(&self, names: &mut BTreeSet<String>) {
        if let Expression::BindParameter { name } = self {
            names.insert(name.clone());
        }
        for child in self.children() {
            child.bind_parameter_names(names);
        }
    }

    /// 收集所有函数名
    pub fn function_names(&self, names: &mut BTreeSet<String>) {
        if let Expression::FunctionCall { name, .. } = self {
            names.insert(name.clone());
        }
        for child in self.children() {
            child.function_names(names);
        }
    }
}
