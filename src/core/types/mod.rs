//! 核心标识类型
//!
//! 计划节点与变量都用稳定的整数 id 寻址，节点存放在计划的 arena 中，
//! 变量存放在计划的变量注册表中。

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod expression;
pub mod operators;
pub mod variable;

pub use expression::Expression;
pub use operators::{ArithmeticOperator, ComparisonOperator, LogicalOperator, UnaryOperator};
pub use variable::{Variable, VariableRegistry};

/// 计划节点 id，在一个执行计划内单调递增且不复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 变量 id，同时也是执行期寄存器下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableId(pub u32);

impl VariableId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
