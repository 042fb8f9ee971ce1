//! 表达式显示
//!
//! `Display` 输出近似 AQL 的文本形式，变量显示为 `$id`；
//! `to_explain_json` 输出 explain 使用的 JSON 树，多操作数逻辑运算按右结合折叠成二元节点。

use std::fmt;

use serde_json::{json, Value};

use crate::core::types::expression::Expression;
use crate::core::types::operators::UnaryOperator;
use crate::core::types::VariableRegistry;

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal { value } => write!(f, "{}", value),
            Expression::BindParameter { name } => write!(f, "@{}", name),
            Expression::Reference { variable } => write!(f, "${}", variable),
            Expression::Attribute { base, name } => write!(f, "{}.{}", base, name),
            Expression::IndexedAccess { base, index } => write!(f, "{}[{}]", base, index),
            Expression::Unary { op, operand } => write!(f, "{}({})", op.name(), operand),
            Expression::Arithmetic { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Comparison { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Logical { op, operands } => {
                let sep = match op {
                    crate::core::types::operators::LogicalOperator::And => " && ",
                    crate::core::types::operators::LogicalOperator::Or => " || ",
                };
                let parts: Vec<String> = operands.iter().map(|o| o.to_string()).collect();
                write!(f, "({})", parts.join(sep))
            }
            Expression::Ternary {
                condition,
                then,
                otherwise,
            } => write!(f, "({} ? {} : {})", condition, then, otherwise),
            Expression::FunctionCall { name, args } => {
                let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, parts.join(", "))
            }
            Expression::Array { items } => {
                let parts: Vec<String> = items.iter().map(|a| a.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Expression::Object { attributes } => {
                let parts: Vec<String> = attributes
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Expression::Range { low, high } => write!(f, "{}..{}", low, high),
        }
    }
}

impl Expression {
    /// explain 输出使用的 JSON 树
    pub fn to_explain_json(&self, variables: &VariableRegistry) -> Value {
        match self {
            Expression::Literal { value } => json!({"type": "value", "value": value}),
            Expression::BindParameter { name } => json!({"type": "parameter", "name": name}),
            Expression::Reference { variable } => json!({
                "type": "reference",
                "name": variables.name(*variable),
                "id": variable.0,
            }),
            Expression::Attribute { base, name } => json!({
                "type": "attribute access",
                "name": name,
                "subNodes": [base.to_explain_json(variables)],
            }),
            Expression::IndexedAccess { base, index } => json!({
                "type": "indexed access",
                "subNodes": [base.to_explain_json(variables), index.to_explain_json(variables)],
            }),
            Expression::Unary { op, operand } => {
                let kind = match op {
                    UnaryOperator::Not => "unary not",
                    UnaryOperator::Minus => "unary minus",
                    UnaryOperator::Plus => "unary plus",
                };
                json!({"type": kind, "subNodes": [operand.to_explain_json(variables)]})
            }
            Expression::Arithmetic { op, left, right } => json!({
                "type": format!("arithmetic {}", op.symbol()),
                "subNodes": [left.to_explain_json(variables), right.to_explain_json(variables)],
            }),
            Expression::Comparison { op, left, right } => json!({
                "type": format!("compare {}", op.symbol()),
                "subNodes": [left.to_explain_json(variables), right.to_explain_json(variables)],
            }),
            Expression::Logical { op, operands } => {
                let kind = format!("logical {}", op.name());
                match operands.as_slice() {
                    [] => json!({"type": "value", "value": matches!(op, crate::core::types::operators::LogicalOperator::And)}),
                    [single] => single.to_explain_json(variables),
                    [first, rest @ ..] => {
                        let right = if rest.len() == 1 {
                            rest[0].to_explain_json(variables)
                        } else {
                            Expression::Logical {
                                op: *op,
                                operands: rest.to_vec(),
                            }
                            .to_explain_json(variables)
                        };
                        json!({"type": kind, "subNodes": [first.to_explain_json(variables), right]})
                    }
                }
            }
            Expression::Ternary {
                condition,
                then,
                otherwise,
            } => json!({
                "type": "ternary",
                "subNodes": [
                    condition.to_explain_json(variables),
                    then.to_explain_json(variables),
                    otherwise.to_explain_json(variables),
                ],
            }),
            Expression::FunctionCall { name, args } => json!({
                "type": "function call",
                "name": name,
                "subNodes": [{
                    "type": "array",
                    "subNodes": args.iter().map(|a| a.to_explain_json(variables)).collect::<Vec<_>>(),
                }],
            }),
            Expression::Array { items } => json!({
                "type": "array",
                "subNodes": items.iter().map(|a| a.to_explain_json(variables)).collect::<Vec<_>>(),
            }),
            Expression::Object { attributes } => json!({
                "type": "object",
                "subNodes": attributes
                    .iter()
                    .map(|(k, v)| json!({
                        "type": "object element",
                        "name": k,
                        "subNodes": [v.to_explain_json(variables)],
                    }))
                    .collect::<Vec<_>>(),
            }),
            Expression::Range { low, high } => json!({
                "type": "range",
                "subNodes": [low.to_explain_json(variables), high.to_explain_json(variables)],
            }),
        }
    }
}
