//! 数学函数实现

use rand::Rng;

use crate::core::error::ExpressionError;
use crate::core::value::{number_value, to_number};
use crate::core::{Value, WarningCollector};
use crate::expression::functions::registry::{FunctionDef, FunctionRegistry};

pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register(FunctionDef::new("ABS", 1, 1, execute_abs));
    registry.register(FunctionDef::new("FLOOR", 1, 1, execute_floor));
    registry.register(FunctionDef::new("CEIL", 1, 1, execute_ceil));
    registry.register(FunctionDef::new("ROUND", 1, 1, execute_round));
    registry.register(FunctionDef::new("SQRT", 1, 1, execute_sqrt));
    registry.register(FunctionDef::new("RAND", 0, 0, execute_rand).non_deterministic());
}

fn execute_abs(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(number_value(to_number(&args[0]).abs()))
}

fn execute_floor(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(number_value(to_number(&args[0]).floor()))
}

fn execute_ceil(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(number_value(to_number(&args[0]).ceil()))
}

fn execute_round(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(number_value(to_number(&args[0]).round()))
}

fn execute_sqrt(args: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    Ok(number_value(to_number(&args[0]).sqrt()))
}

/// [0, 1) 之间的随机数
fn execute_rand(_: &[Value], _: &mut WarningCollector) -> Result<Value, ExpressionError> {
    let value: f64 = rand::thread_rng().gen();
    Ok(serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}
