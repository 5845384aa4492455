//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。适配器在预期的失败路径上返回
//! `TranslationResult`，不会跨越调度器边界 panic。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// 请求的后端类型不在合并后的目录中（失败关闭，不回退到默认后端）
    #[error("没有匹配的翻译后端: {0}")]
    NoMatchingBackend(String),

    /// 远程目录拉取失败，对应目录被置为空列表
    #[error("目录拉取失败: {0}")]
    CatalogFetchFailed(String),

    /// 网络或 HTTP 层失败
    #[error("传输错误: {0}")]
    TransportError(String),

    /// 解码得到的片段数与期望不一致（仅警告，结果仍然返回）
    #[error("片段数量不匹配: 期望 {expected}，得到 {actual}")]
    DecodeMismatch { expected: usize, actual: usize },

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    ///
    /// 引擎本身不会自动重试，这里只给调用方提供判断依据。
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::TransportError(_) => true,
            TranslationError::TimeoutError(_) => true,
            TranslationError::CatalogFetchFailed(_) => true,
            TranslationError::NoMatchingBackend(_) => false,
            TranslationError::DecodeMismatch { .. } => false,
            TranslationError::ConfigError(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::NoMatchingBackend(_) => ErrorSeverity::Error,
            TranslationError::CatalogFetchFailed(_) => ErrorSeverity::Warning,
            TranslationError::TransportError(_) => ErrorSeverity::Error,
            TranslationError::DecodeMismatch { .. } => ErrorSeverity::Warning,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::TimeoutError(_) => ErrorSeverity::Warning,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::NoMatchingBackend(_) => ErrorCategory::Routing,
            TranslationError::CatalogFetchFailed(_) => ErrorCategory::Catalog,
            TranslationError::TransportError(_) => ErrorCategory::Network,
            TranslationError::DecodeMismatch { .. } => ErrorCategory::Decoding,
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::TimeoutError(_) => ErrorCategory::Timeout,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 是否需要向用户展示提示
    ///
    /// 只有无法恢复的情况（没有匹配后端、传输失败）才需要提示，
    /// 片段数量不匹配只记录日志。
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            TranslationError::NoMatchingBackend(_)
                | TranslationError::TransportError(_)
                | TranslationError::TimeoutError(_)
        )
    }

    /// 面向用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            TranslationError::NoMatchingBackend(key) => {
                format!("-2: Translation backend '{}' is not available", key)
            }
            TranslationError::TransportError(_) | TranslationError::TimeoutError(_) => {
                "-1: Unknown error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// 在消息后附加上下文，变体不变
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        match &mut self {
            TranslationError::NoMatchingBackend(msg)
            | TranslationError::CatalogFetchFailed(msg)
            | TranslationError::TransportError(msg)
            | TranslationError::ConfigError(msg)
            | TranslationError::InvalidInput(msg)
            | TranslationError::TimeoutError(msg)
            | TranslationError::ParseError(msg)
            | TranslationError::SerializationError(msg)
            | TranslationError::InternalError(msg) => {
                msg.push_str(&format!(" ({})", context));
            }
            TranslationError::DecodeMismatch { .. } => {}
        }
        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Routing,
    Catalog,
    Network,
    Decoding,
    Configuration,
    Input,
    Timeout,
    Parsing,
    Serialization,
    Internal,
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::TimeoutError(format!("HTTP请求超时: {}", error))
        } else if error.is_decode() {
            // 接口返回了无法解析的响应体，按传输失败提示用户
            TranslationError::TransportError(format!("响应解析失败: {}", error))
        } else {
            TranslationError::TransportError(format!("HTTP请求失败: {}", error))
        }
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::TransportError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(error: config::ConfigError) -> Self {
        TranslationError::ConfigError(format!("配置错误: {}", error))
    }
}

impl From<url::ParseError> for TranslationError {
    fn from(error: url::ParseError) -> Self {
        TranslationError::ConfigError(format!("无效的地址: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误日志
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_visibility() {
        assert!(TranslationError::NoMatchingBackend("x".into()).is_user_visible());
        assert!(TranslationError::TransportError("down".into()).is_user_visible());
        assert!(!TranslationError::DecodeMismatch { expected: 2, actual: 1 }.is_user_visible());
        assert!(!TranslationError::CatalogFetchFailed("503".into()).is_user_visible());
    }

    #[test]
    fn test_context_keeps_variant() {
        let err = TranslationError::TransportError("reset".into()).with_context("chat");
        assert!(matches!(err, TranslationError::TransportError(_)));
        assert!(err.to_string().contains("chat"));

        let mismatch = TranslationError::DecodeMismatch { expected: 3, actual: 2 };
        assert_eq!(mismatch.clone().with_context("ignored"), mismatch);
    }

    #[test]
    fn test_retryable_and_severity() {
        assert!(TranslationError::TimeoutError("60s".into()).is_retryable());
        assert!(!TranslationError::NoMatchingBackend("x".into()).is_retryable());
        assert_eq!(
            TranslationError::CatalogFetchFailed("503".into()).severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            TranslationError::DecodeMismatch { expected: 2, actual: 1 }.category(),
            ErrorCategory::Decoding
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            TranslationError::NoMatchingBackend("7".into()).user_message(),
            "-2: Translation backend '7' is not available"
        );
        assert_eq!(
            TranslationError::TransportError("HTTP 502".into()).user_message(),
            "-1: Unknown error"
        );
    }
}
