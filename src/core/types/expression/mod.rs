//! 统一表达式类型定义
//!
//! 本模块定义 Calculation 节点里使用的表达式树 `Expression`。
//!
//! ## 变体说明
//!
//! | 变体 | 用途 |
//! |------|------|
//! | `Literal` | 字面量值 |
//! | `BindParameter` | 绑定参数 `@name` |
//! | `Reference` | 变量引用 |
//! | `Attribute` | 属性访问 |
//! | `IndexedAccess` | 下标访问 |
//! | `Unary` | 一元运算 |
//! | `Arithmetic` | 算术运算 |
//! | `Comparison` | 比较运算 |
//! | `Logical` | 逻辑与/或（二元或展平后的多元） |
//! | `Ternary` | 三元运算 |
//! | `FunctionCall` | 函数调用 |
//! | `Array` / `Object` | 数组/对象字面量 |
//! | `Range` | 整数范围 |
//!
//! ## 使用示例
//!
//! ```rust
//! use aql_optimizer::core::types::expression::Expression;
//! use aql_optimizer::core::types::VariableId;
//!
//! let doc = VariableId(0);
//! let cond = Expression::eq(Expression::attribute_path(doc, "value"), Expression::literal(1));
//! assert!(cond.is_deterministic());
//! ```

pub mod constructors;
pub mod def;
pub mod display;
pub mod inspection;

pub use def::Expression;
