//! 函数注册表
//!
//! 进程内唯一的只读函数表，记录每个函数的参数个数范围、是否确定性、
//! 是否可能抛错以及实现。优化规则通过这些标记判断能否移动或删除计算。

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::core::error::ExpressionError;
use crate::core::{Value, WarningCollector};

use super::builtin;

/// 函数实现签名
pub type FunctionImpl = fn(&[Value], &mut WarningCollector) -> Result<Value, ExpressionError>;

/// 函数定义
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    /// 相同输入总是得到相同输出
    pub deterministic: bool,
    /// 求值可能失败
    pub can_throw: bool,
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: usize,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            deterministic: true,
            can_throw: false,
            implementation,
        }
    }

    pub const fn non_deterministic(mut self) -> Self {
        self.deterministic = false;
        self
    }

    pub const fn throwing(mut self) -> Self {
        self.can_throw = true;
        self
    }

    pub fn check_arity(&self, count: usize) -> bool {
        count >= self.min_args && count <= self.max_args
    }

    /// 校验参数个数后调用实现
    pub fn call(&self, args: &[Value], warnings: &mut WarningCollector) -> Result<Value, ExpressionError> {
        if !self.check_arity(args.len()) {
            return Err(ExpressionError::argument_count(
                self.name,
                self.min_args,
                self.max_args,
            ));
        }
        (self.implementation)(args, warnings)
    }
}

/// 函数注册表
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self::default();
        builtin::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// 按大写函数名查找
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

static GLOBAL_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// 全局函数注册表
pub fn global_registry() -> &'static FunctionRegistry {
    GLOBAL_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// 在全局注册表中查找函数
pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    global_registry().get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_flags() {
        let rand = lookup("RAND").expect("RAND 应已注册");
        assert!(!rand.deterministic);
        let fail = lookup("FAIL").expect("FAIL 应已注册");
        assert!(fail.can_throw);
        let length = lookup("LENGTH").expect("LENGTH 应已注册");
        assert!(length.deterministic && !length.can_throw);
        assert!(lookup("length").is_none());
    }

    #[test]
    fn test_arity_check() {
        let mut warnings = WarningCollector::default();
        let abs = lookup("ABS").expect("ABS 应已注册");
        assert!(abs.call(&[], &mut warnings).is_err());
        assert_eq!(abs.call(&[json!(-3)], &mut warnings), Ok(json!(3)));
    }
}
