//! 变量定义
//!
//! 变量是在节点之间流动的命名值。每个变量只有一个生产节点，
//! 可以被任意多个节点按 id 引用。

use serde::{Deserialize, Serialize};

use super::VariableId;

/// 计划变量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
}

impl Variable {
    /// 编译器生成的临时变量以 `#` 开头
    pub fn is_temporary(&self) -> bool {
        self.name.starts_with('#')
    }
}

/// 变量注册表，按 id 顺序存放一个计划里的全部变量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建用户可见变量
    pub fn create(&mut self, name: impl Into<String>) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(Variable {
            id,
            name: name.into(),
        });
        id
    }

    /// 创建临时变量，名称形如 `#3`
    pub fn create_temporary(&mut self) -> VariableId {
        let name = format!("#{}", self.variables.len());
        self.create(name)
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// 变量名，未知 id 时返回 `#id`
    pub fn name(&self, id: VariableId) -> String {
        self.get(id)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}
