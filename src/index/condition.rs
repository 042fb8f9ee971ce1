//! 索引查找条件
//!
//! `IndexCondition` 是计划里 IndexNode 携带的条件：若干 `字段 op 表达式` 子句的合取，
//! 表达式可以引用外层循环的变量。执行时逐行求值得到 `IndexLookup`，交给存储层查找。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::expression::Expression;
use crate::core::types::operators::ComparisonOperator;
use crate::core::types::{VariableId, VariableRegistry};
use crate::core::value::get_path;
use crate::core::Value;

/// 单个字段上的条件子句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexClause {
    /// 属性路径
    pub path: Vec<String>,
    pub op: ComparisonOperator,
    pub value: Expression,
}

impl IndexClause {
    pub fn new(path: Vec<String>, op: ComparisonOperator, value: Expression) -> Self {
        Self { path, op, value }
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }

    /// 还原成 `doc.path op value` 形式的过滤表达式
    pub fn to_expression(&self, variable: VariableId) -> Expression {
        Expression::compare(
            Expression::attribute_path(variable, &self.dotted_path()),
            self.op,
            self.value.clone(),
        )
    }
}

/// 索引条件，子句之间为合取关系
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexCondition {
    pub clauses: Vec<IndexClause>,
}

impl IndexCondition {
    pub fn new(clauses: Vec<IndexClause>) -> Self {
        Self { clauses }
    }

    /// 无条件，全索引扫描
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// 子句值表达式引用的变量
    pub fn variables(&self) -> Vec<VariableId> {
        let mut result: Vec<VariableId> = Vec::new();
        for clause in &self.clauses {
            for variable in clause.value.variables() {
                if !result.contains(&variable) {
                    result.push(variable);
                }
            }
        }
        result
    }

    /// 是否包含与给定表达式完全相同的子句
    pub fn covers(&self, variable: VariableId, expression: &Expression) -> bool {
        self.clauses
            .iter()
            .any(|clause| &clause.to_expression(variable) == expression)
    }

    pub fn to_explain_json(&self, registry: &VariableRegistry) -> Value {
        Value::Array(
            self.clauses
                .iter()
                .map(|clause| {
                    serde_json::json!({
                        "attribute": clause.dotted_path(),
                        "operator": clause.op.symbol(),
                        "value": clause.value.to_explain_json(registry),
                    })
                })
                .collect(),
        )
    }
}

impl fmt::Display for IndexCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|c| format!("{} {} {}", c.dotted_path(), c.op.symbol(), c.value))
            .collect();
        write!(f, "{}", parts.join(" && "))
    }
}

/// 求值后的查找子句
#[derive(Debug, Clone, PartialEq)]
pub struct LookupClause {
    pub path: Vec<String>,
    pub op: ComparisonOperator,
    pub value: Value,
}

/// 求值后的索引查找
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexLookup {
    pub clauses: Vec<LookupClause>,
}

impl IndexLookup {
    pub fn new(clauses: Vec<LookupClause>) -> Self {
        Self { clauses }
    }

    /// 文档是否满足全部子句
    pub fn matches(&self, document: &Value) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.op.evaluate(&get_path(document, &clause.path), &clause.value))
    }
}
