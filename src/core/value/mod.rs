//! Value 模块 - AQL 值语义
//!
//! 文档与中间结果统一使用 `serde_json::Value` 表示，本模块在其上补齐 AQL 语义：
//! - 比较逻辑 (`comparison.rs`)：类型顺序 null < bool < number < string < array < object
//! - 类型转换 (`conversion.rs`)：真值、数值、字符串转换
//! - 算术运算 (`operations.rs`)

pub mod comparison;
pub mod conversion;
pub mod operations;

pub use serde_json::Value;

pub use comparison::{compare_values, type_weight, values_equal, ValueKey};
pub use conversion::{estimate_size, number_value, to_bool, to_number, to_string_value};
pub use operations::{arithmetic, ArithmeticError, ArithmeticOperator};

/// 读取对象属性，非对象或属性缺失时返回 null
pub fn get_attribute(value: &Value, name: &str) -> Value {
    match value {
        Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// 沿属性路径读取嵌套属性
pub fn get_path(value: &Value, path: &[String]) -> Value {
    let mut current = value;
    for name in path {
        match current {
            Value::Object(map) => match map.get(name) {
                Some(next) => current = next,
                None => return Value::Null,
            },
            _ => return Value::Null,
        }
    }
    current.clone()
}

/// 按点分路径读取属性，例如 `"address.city"`
pub fn get_dotted(value: &Value, dotted: &str) -> Value {
    let path: Vec<String> = dotted.split('.').map(str::to_string).collect();
    get_path(value, &path)
}
