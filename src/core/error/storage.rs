//! 存储层错误类型
//!
//! 存储协作方返回的错误原样向上传播，数值错误码保持不变。

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};

/// 存储层结果类型
pub type StorageResult<T> = Result<T, StorageError>;

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("集合不存在: {0}")]
    CollectionNotFound(String),
    #[error("集合已存在: {0}")]
    CollectionAlreadyExists(String),
    #[error("文档不存在: {0}")]
    DocumentNotFound(String),
    #[error("文档类型无效: {0}")]
    DocumentTypeInvalid(String),
    #[error("索引不存在: {0}")]
    IndexNotFound(String),
    #[error("唯一约束冲突: 索引 {index}, 键 {key}")]
    UniqueConstraintViolated { index: String, key: String },
    #[error("锁超时: {0}")]
    LockTimeout(String),
    #[error("事务已中止: {0}")]
    TransactionAborted(String),
    #[error("无效输入: {0}")]
    InvalidInput(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::LockTimeout(_) | StorageError::TransactionAborted(_)
        )
    }
}

impl ToPublicError for StorageError {
    fn error_code(&self) -> ErrorCode {
        match self {
            StorageError::CollectionNotFound(_) => ErrorCode::CollectionNotFound,
            StorageError::CollectionAlreadyExists(_) => ErrorCode::BadParameter,
            StorageError::DocumentNotFound(_) => ErrorCode::DocumentNotFound,
            StorageError::DocumentTypeInvalid(_) => ErrorCode::DocumentTypeInvalid,
            StorageError::IndexNotFound(_) => ErrorCode::IndexNotFound,
            StorageError::UniqueConstraintViolated { .. } => ErrorCode::UniqueConstraintViolated,
            StorageError::LockTimeout(_) => ErrorCode::LockTimeout,
            StorageError::TransactionAborted(_) => ErrorCode::TransactionAborted,
            StorageError::InvalidInput(_) => ErrorCode::BadParameter,
        }
    }
}
