//! 表达式函数模块
//!
//! ## 模块结构
//!
//! - `registry.rs` - 函数定义与全局注册表
//! - `builtin/` - 内置函数实现
//!
//! ## 使用方式
//!
//! ```rust
//! use aql_optimizer::core::WarningCollector;
//! use aql_optimizer::expression::functions;
//! use serde_json::json;
//!
//! let abs = functions::lookup("ABS").unwrap();
//! let mut warnings = WarningCollector::default();
//! assert_eq!(abs.call(&[json!(-5)], &mut warnings).unwrap(), json!(5));
//! ```

pub mod builtin;
pub mod registry;

pub use registry::{global_registry, lookup, FunctionDef, FunctionImpl, FunctionRegistry};
