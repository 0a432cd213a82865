//! TaskFlow 统一错误类型定义
//!
//! 使用 `thiserror` 库提供统一的错误处理，支持错误链式传播。

use std::io;
use thiserror::Error;

/// TaskFlow 错误类型
#[derive(Debug, Error)]
pub enum TaskFlowError {
    /// I/O 错误（数据库文件、配置文件读写等）
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 存储错误（通用）
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite 错误
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON 解析错误
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML 解析错误
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// 资源不存在
    #[error("Not found: {0}")]
    NotFound(String),

    /// 无效数据（本地校验失败，不会触发任何网络/存储调用）
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 配置错误（如缺少 AI gateway 凭证）
    #[error("Config error: {0}")]
    Config(String),

    /// AI gateway 限流（对应 HTTP 429，调用方负责 backoff）
    #[error("Rate limit exceeded")]
    RateLimited,

    /// AI gateway 其他上游错误
    #[error("AI service error: {0}")]
    Upstream(String),
}

/// TaskFlow Result 类型别名
pub type Result<T> = std::result::Result<T, TaskFlowError>;

impl TaskFlowError {
    /// 创建 Storage 错误
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// 创建 NotFound 错误
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// 创建 InvalidData 错误
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// 创建 Config 错误
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// 创建 Upstream 错误
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}
