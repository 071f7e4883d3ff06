pub mod document;
pub mod search;

use thiserror::Error;

/// 搜索索引适配层错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Index not found: {0}")]
    IndexMissing(String),
    #[error("Document {id} not found in {index}")]
    DocumentNotFound { index: String, id: String },
    #[error("Index unavailable: {0}")]
    Unavailable(String),
    #[error("Index rejected request: {0}")]
    Rejected(String),
    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl IndexError {
    /// 只有传输层/服务端临时故障值得重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::Unavailable(_))
    }
}
