//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 原始定位数据不合法
    #[error("invalid fix field '{field}': {message}")]
    InvalidFix {
        /// 字段名
        field: &'static str,
        /// 错误消息
        message: String,
    },

    /// 回放文件加载失败
    #[error("failed to load replay file '{path}': {message}")]
    ReplayLoad {
        /// 文件路径
        path: String,
        /// 错误消息
        message: String,
    },

    /// 通道已关闭
    #[error("channel closed for source {source_name}")]
    ChannelClosed {
        /// 数据源名称
        source_name: String,
    },

    /// 数据源已注册
    #[error("source {source_name} is already registered")]
    DuplicateSource {
        /// 数据源名称
        source_name: String,
    },
}

impl IngestionError {
    pub(crate) fn invalid_fix(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidFix {
            field,
            message: message.into(),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
