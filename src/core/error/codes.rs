//! 对外错误码定义
//!
//! 错误码对调用方保持稳定，测试会逐一比对 `errorNum`。
//! 编号沿用 AQL 服务端的约定：
//! - 1–99: 通用错误
//! - 12xx: 存储/集合/文档错误
//! - 15xx: 查询执行错误
//! - 159x: 优化器与计划图错误
//! - 16xx: 事务错误

use serde::{Deserialize, Serialize};

/// 对外错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // ==================== 通用 ====================
    Success = 0,
    /// 内部错误
    Internal = 4,
    /// 参数错误
    BadParameter = 10,
    /// 锁等待超时
    LockTimeout = 18,

    // ==================== 存储 (12xx) ====================
    /// 文档不存在
    DocumentNotFound = 1202,
    /// 集合不存在
    CollectionNotFound = 1203,
    /// 唯一约束冲突
    UniqueConstraintViolated = 1210,
    /// 索引不存在
    IndexNotFound = 1212,
    /// 文档类型无效
    DocumentTypeInvalid = 1227,

    // ==================== 查询 (15xx) ====================
    /// 查询被终止
    QueryKilled = 1500,
    /// 查询无法解析 / 计划结构无效
    QueryParse = 1501,
    /// 未知函数
    QueryFunctionNameUnknown = 1540,
    /// 函数参数数量错误
    QueryFunctionArgumentNumberMismatch = 1541,
    /// 绑定参数缺失
    QueryBindParameterMissing = 1552,
    /// 除零
    QueryDivisionByZero = 1562,
    /// FOR 循环的操作数不是数组
    QueryArrayExpected = 1563,
    /// FAIL() 被调用
    QueryFail = 1569,

    // ==================== 优化器 (159x) ====================
    /// 优化器迭代次数超限
    OptimizerIterationLimitExceeded = 1590,
    /// 规则名称重复
    DuplicateRuleName = 1591,
    /// 无效依赖
    InvalidDependency = 1592,
    /// 悬空引用
    DanglingReference = 1593,
    /// 节点有多个下游
    NodeHasMultipleDependents = 1594,
    /// 节点不存在
    NodeNotFound = 1595,

    // ==================== 事务 (16xx) ====================
    /// 事务中止
    TransactionAborted = 1654,
}

impl ErrorCode {
    /// 获取错误码的 i32 值
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// 根据 i32 值获取错误码
    pub fn from_i32(code: i32) -> Option<Self> {
        let code = match code {
            0 => ErrorCode::Success,
            4 => ErrorCode::Internal,
            10 => ErrorCode::BadParameter,
            18 => ErrorCode::LockTimeout,
            1202 => ErrorCode::DocumentNotFound,
            1203 => ErrorCode::CollectionNotFound,
            1210 => ErrorCode::UniqueConstraintViolated,
            1212 => ErrorCode::IndexNotFound,
            1227 => ErrorCode::DocumentTypeInvalid,
            1500 => ErrorCode::QueryKilled,
            1501 => ErrorCode::QueryParse,
            1540 => ErrorCode::QueryFunctionNameUnknown,
            1541 => ErrorCode::QueryFunctionArgumentNumberMismatch,
            1552 => ErrorCode::QueryBindParameterMissing,
            1562 => ErrorCode::QueryDivisionByZero,
            1563 => ErrorCode::QueryArrayExpected,
            1569 => ErrorCode::QueryFail,
            1590 => ErrorCode::OptimizerIterationLimitExceeded,
            1591 => ErrorCode::DuplicateRuleName,
            1592 => ErrorCode::InvalidDependency,
            1593 => ErrorCode::DanglingReference,
            1594 => ErrorCode::NodeHasMultipleDependents,
            1595 => ErrorCode::NodeNotFound,
            1654 => ErrorCode::TransactionAborted,
            _ => return None,
        };
        Some(code)
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_i32() {
            0 => ErrorCategory::Success,
            1..=99 => ErrorCategory::General,
            1200..=1299 => ErrorCategory::Storage,
            1500..=1589 => ErrorCategory::Query,
            1590..=1599 => ErrorCategory::Optimizer,
            1600..=1699 => ErrorCategory::Transaction,
            _ => ErrorCategory::Unknown,
        }
    }

    /// 获取默认的错误消息
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "成功",
            ErrorCode::Internal => "内部错误",
            ErrorCode::BadParameter => "参数错误",
            ErrorCode::LockTimeout => "锁等待超时",
            ErrorCode::DocumentNotFound => "文档不存在",
            ErrorCode::CollectionNotFound => "集合不存在",
            ErrorCode::UniqueConstraintViolated => "唯一约束冲突",
            ErrorCode::IndexNotFound => "索引不存在",
            ErrorCode::DocumentTypeInvalid => "文档类型无效",
            ErrorCode::QueryKilled => "查询已被终止",
            ErrorCode::QueryParse => "查询计划无效",
            ErrorCode::QueryFunctionNameUnknown => "未知函数",
            ErrorCode::QueryFunctionArgumentNumberMismatch => "函数参数数量错误",
            ErrorCode::QueryBindParameterMissing => "绑定参数缺失",
            ErrorCode::QueryDivisionByZero => "除零",
            ErrorCode::QueryArrayExpected => "FOR 循环需要数组",
            ErrorCode::QueryFail => "FAIL() 被调用",
            ErrorCode::OptimizerIterationLimitExceeded => "优化器迭代次数超限",
            ErrorCode::DuplicateRuleName => "规则名称重复",
            ErrorCode::InvalidDependency => "无效依赖",
            ErrorCode::DanglingReference => "悬空引用",
            ErrorCode::NodeHasMultipleDependents => "节点有多个下游",
            ErrorCode::NodeNotFound => "节点不存在",
            ErrorCode::TransactionAborted => "事务已中止",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Success,
    General,
    Storage,
    Query,
    Optimizer,
    Transaction,
    Unknown,
}

/// 对外暴露的错误信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicError {
    /// 是否出错，固定为 true
    pub error: bool,
    /// 数值错误码
    #[serde(rename = "errorNum")]
    pub error_num: i32,
    /// 错误消息
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

impl PublicError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: true,
            error_num: code.as_i32(),
            error_message: message.into(),
        }
    }
}

/// 转换为对外错误的 trait
pub trait ToPublicError {
    fn error_code(&self) -> ErrorCode;

    fn to_public_error(&self) -> PublicError
    where
        Self: std::fmt::Display,
    {
        PublicError::new(self.error_code(), self.to_string())
    }
}
