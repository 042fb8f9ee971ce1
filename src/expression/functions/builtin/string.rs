//! 字符串函数实现

use crate::core::error::ExpressionError;
use crate::core::value::to_string_value;
use crate::core::{Value, WarningCollector};
use crate::expression::functions::registry::{FunctionDef, FunctionRegistry};

pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register(FunctionDef::new("CONCAT", 0, usize::MAX, execute_concat));
    registry.register(FunctionDef::new("LOWER", 1, 1, execute_lower));
    registry.register(FunctionDef::new("UPPER", 1, 1, execute_upper));
    registry.register(FunctionDef::new("CONTAINS", 2, 2, execute_contains));
}

fn execute_concat(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let mut result = String::new();
    for arg in args {
        match arg {
            Value::Array(items) => {
                for item in items {
                    result.push_str(&to_string_value(item));
                }
            }
            other => result.push_str(&to_string_value(other)),
        }
    }
    Ok(Value::String(result))
}

fn execute_lower(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(Value::String(to_string_value(&args[0]).to_lowercase()))
}

fn execute_upper(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(Value::String(to_string_value(&args[0]).to_uppercase()))
}

fn execute_contains(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let haystack = to_string_value(&args[0]);
    let needle = to_string_value(&args[1]);
    Ok(Value::Bool(haystack.contains(&needle)))
}
