//! 统一错误类型定义

use serde::Serialize;
use thiserror::Error;

/// 工具箱错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ToolboxError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 网络错误
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The shared deadline expired before the operation finished.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The shared cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Failure inside the toolbox itself, not caused by the input.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolboxError {
    /// Whether the error came from the shared context rather than the lookup itself.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled)
    }
}

/// 工具箱 Result 类型别名
pub type ToolboxResult<T> = std::result::Result<T, ToolboxError>;
