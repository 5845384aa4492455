//! 翻译模块
//!
//! 采用清晰的模块化架构：
//! - **core**: 请求调度和引擎门面
//! - **backends**: 旧版接口、对话模型和批量接口适配器
//! - **pipeline**: 片段编解码、流式累积和译文对齐
//! - **storage**: 官方后端目录缓存
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use translation_engine::translation::{EngineConfig, RequestOverrides, TranslationService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TranslationService::from_config(EngineConfig::default())?;
//! let outcome = service
//!     .request_translate(vec!["Hello".into(), "World".into()], RequestOverrides::default())
//!     .await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use backends::{AdapterSet, BackendAdapter, BackendDescriptor};
pub use config::{constants, ConfigManager, EngineConfig, SettingsProvider, StaticSettings};
pub use self::core::{DispatchOutcome, EngineEvent, EngineState, RequestScheduler, TranslationService};
pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};
pub use pipeline::{FramingMode, SegmentCodec, StreamAccumulator};
pub use storage::{BackendCatalogResolver, CatalogCache, CatalogSource};
pub use types::{
    RequestOverrides, Segment, Selection, TranslationDomain, TranslationOutput, TranslationRequest,
};

/// 检查翻译配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}

/// 在当前目录生成示例配置文件 `translation-engine.toml`
pub fn generate_example_config() -> TranslationResult<()> {
    ConfigManager::generate_example_config("translation-engine.toml")?;
    tracing::info!("已生成示例配置文件: translation-engine.toml");
    Ok(())
}
