//! 工具函数实现

use chrono::Utc;

use crate::core::error::ExpressionError;
use crate::core::value::{number_value, to_bool, to_number, to_string_value};
use crate::core::{Value, WarningCollector};
use crate::expression::functions::registry::{FunctionDef, FunctionRegistry};

pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register(FunctionDef::new("TO_NUMBER", 1, 1, execute_to_number));
    registry.register(FunctionDef::new("TO_STRING", 1, 1, execute_to_string));
    registry.register(FunctionDef::new("TO_BOOL", 1, 1, execute_to_bool));
    registry.register(FunctionDef::new("NOT_NULL", 1, usize::MAX, execute_not_null));
    registry.register(FunctionDef::new("PASSTHRU", 1, 1, execute_passthru));
    // 与 PASSTHRU 相同，但阻止优化器移动或合并
    registry.register(FunctionDef::new("NOOPT", 1, 1, execute_passthru).non_deterministic());
    registry.register(FunctionDef::new("DATE_NOW", 0, 0, execute_date_now).non_deterministic());
    registry.register(FunctionDef::new("FAIL", 0, 1, execute_fail).throwing());
}

fn execute_to_number(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(number_value(to_number(&args[0])))
}

fn execute_to_string(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(Value::String(to_string_value(&args[0])))
}

fn execute_to_bool(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(Value::Bool(to_bool(&args[0])))
}

fn execute_not_null(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

fn execute_passthru(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(args[0].clone())
}

fn execute_date_now(_: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(Value::from(Utc::now().timestamp_millis()))
}

fn execute_fail(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let message = args
        .first()
        .map(to_string_value)
        .unwrap_or_default();
    Err(ExpressionError::function_failed(format!("FAIL({}) 被调用", message)))
}
