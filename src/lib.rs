//! # Translation Engine
//!
//! 多后端片段翻译的客户端编排引擎。
//!
//! ## 模块组织
//!
//! - `translation` - 目录解析、片段编解码、请求调度和流式累积
//! - `env` - 类型安全的环境变量访问

pub mod env;
pub mod translation;

pub use translation::{
    EngineConfig, EngineEvent, EngineState, TranslationError, TranslationResult,
    TranslationService,
};

/// 初始化日志
///
/// 日志级别取自 `TRANSLATION_ENGINE_LOG_LEVEL`，`RUST_LOG` 存在时优先。
/// 重复调用不会报错。
pub fn init_logging() {
    use crate::env::EnvVar;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = crate::env::core::LogLevel::get().unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("translation_engine={}", level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
