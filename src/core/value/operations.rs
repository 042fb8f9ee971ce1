use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::conversion::{number_value, to_number};

/// 算术运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
        }
    }
}

/// 算术运算的软错误，调用方据此产生警告并返回 null
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    DivisionByZero,
}

/// 执行 AQL 算术运算，操作数先做数值转换
pub fn arithmetic(
    op: ArithmeticOperator,
    left: &Value,
    right: &Value,
) -> Result<Value, ArithmeticError> {
    let l = to_number(left);
    let r = to_number(right);
    let result = match op {
        ArithmeticOperator::Add => l + r,
        ArithmeticOperator::Subtract => l - r,
        ArithmeticOperator::Multiply => l * r,
        ArithmeticOperator::Divide => {
            if r == 0.0 {
                return Err(ArithmeticError::DivisionByZero);
            }
            l / r
        }
        ArithmeticOperator::Modulo => {
            if r == 0.0 {
                return Err(ArithmeticError::DivisionByZero);
            }
            l % r
        }
    };
    Ok(number_value(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arithmetic() {
        assert_eq!(arithmetic(ArithmeticOperator::Add, &json!(1), &json!(2)), Ok(json!(3)));
        assert_eq!(
            arithmetic(ArithmeticOperator::Multiply, &json!("3"), &json!(1.5)),
            Ok(json!(4.5))
        );
        assert_eq!(arithmetic(ArithmeticOperator::Modulo, &json!(7), &json!(3)), Ok(json!(1)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            arithmetic(ArithmeticOperator::Divide, &json!(1), &json!(0)),
            Err(ArithmeticError::DivisionByZero)
        );
    }
}
