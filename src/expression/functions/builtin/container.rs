//! 数组与对象函数实现

use crate::core::error::ExpressionError;
use crate::core::value::{compare_values, number_value, to_number, values_equal};
use crate::core::{Value, WarningCollector};
use crate::expression::functions::registry::{FunctionDef, FunctionRegistry};

pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register(FunctionDef::new("LENGTH", 1, 1, execute_length));
    registry.register(FunctionDef::new("FIRST", 1, 1, execute_first));
    registry.register(FunctionDef::new("LAST", 1, 1, execute_last));
    registry.register(FunctionDef::new("SUM", 1, 1, execute_sum));
    registry.register(FunctionDef::new("MIN", 1, 1, execute_min));
    registry.register(FunctionDef::new("MAX", 1, 1, execute_max));
    registry.register(FunctionDef::new("AVERAGE", 1, 1, execute_average));
    registry.register(FunctionDef::new("UNIQUE", 1, 1, execute_unique));
    registry.register(FunctionDef::new("MERGE", 1, usize::MAX, execute_merge));
    registry.register(FunctionDef::new("HAS", 2, 2, execute_has));
}

fn execute_length(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let len = match &args[0] {
        Value::Null => 0,
        Value::Bool(b) => usize::from(*b),
        Value::Number(n) => n.to_string().len(),
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
    };
    Ok(Value::from(len as u64))
}

fn execute_first(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(match &args[0] {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    })
}

fn execute_last(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(match &args[0] {
        Value::Array(items) => items.last().cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    })
}

/// 数组中非 null 元素
fn non_null(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
        _ => Vec::new(),
    }
}

fn execute_sum(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    if !args[0].is_array() {
        return Ok(Value::Null);
    }
    Ok(number_value(non_null(&args[0]).into_iter().map(to_number).sum()))
}

fn execute_min(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(non_null(&args[0])
        .into_iter()
        .min_by(|a, b| compare_values(a, b))
        .cloned()
        .unwrap_or(Value::Null))
}

fn execute_max(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(non_null(&args[0])
        .into_iter()
        .max_by(|a, b| compare_values(a, b))
        .cloned()
        .unwrap_or(Value::Null))
}

fn execute_average(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let values = non_null(&args[0]);
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let sum: f64 = values.iter().map(|v| to_number(v)).sum();
    Ok(number_value(sum / values.len() as f64))
}

fn execute_unique(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let Value::Array(items) = &args[0] else {
        return Ok(Value::Null);
    };
    let mut result: Vec<Value> = Vec::new();
    for item in items {
        if !result.iter().any(|v| values_equal(v, item)) {
            result.push(item.clone());
        }
    }
    Ok(Value::Array(result))
}

fn execute_merge(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let mut result = serde_json::Map::new();
    for arg in args {
        if let Value::Object(map) = arg {
            for (k, v) in map {
                result.insert(k.clone(), v.clone());
            }
        }
    }
    Ok(Value::Object(result))
}

fn execute_has(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let has = match (&args[0], &args[1]) {
        (Value::Object(map), Value::String(name)) => map.contains_key(name),
        _ => false,
    };
    Ok(Value::Bool(has))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregation_helpers() {
        let mut w = WarningCollector::default();
        let values = json!([3, null, 1, 2]);
        assert_eq!(execute_sum(&[values.clone()], &mut w), Ok(json!(6)));
        assert_eq!(execute_min(&[values.clone()], &mut w), Ok(json!(1)));
        assert_eq!(execute_max(&[values.clone()], &mut w), Ok(json!(3)));
        assert_eq!(execute_average(&[values], &mut w), Ok(json!(2)));
        assert_eq!(execute_length(&[json!({"a": 1})], &mut w), Ok(json!(1)));
    }

    #[test]
    fn test_unique_and_merge() {
        let mut w = WarningCollector::default();
        assert_eq!(execute_unique(&[json!([1, 1.0, "1", 2])], &mut w), Ok(json!([1, "1", 2])));
        assert_eq!(
            execute_merge(&[json!({"a": 1}), json!({"a": 2, "b": 3})], &mut w),
            Ok(json!({"a": 2, "b": 3}))
        );
    }
}
