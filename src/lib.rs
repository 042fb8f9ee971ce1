//! AQL 执行计划优化器
//!
//! 把查询的初始执行计划交给一组命名的重写规则，跑到不动点后按代价选出最终计划，
//! 再由内置的拉取式执行器在存储协作方上执行。
//!
//! - `core`：标识、值语义、错误与警告
//! - `expression`：表达式求值与内置函数
//! - `index`：索引描述符与索引条件
//! - `storage`：存储协作方接口与内存实现
//! - `query`：计划模型、重写规则、优化器、执行器与查询引擎
//! - `config`：TOML 配置
//! - `utils`：日志初始化

pub mod config;
pub mod core;
pub mod expression;
pub mod index;
pub mod query;
pub mod storage;
pub mod utils;
