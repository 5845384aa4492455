//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值。
//! 设置的持久化由宿主应用负责，引擎只读取当前快照。

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::types::Selection;

/// 用户配置的 OpenAI 兼容对话接口
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatApiConfig {
    pub api_uri: String,
    pub api_key: String,
    pub api_model: String,
    pub model_name: String,
}

impl ChatApiConfig {
    /// 模型为空时无法生成 `type` 键
    ///
    /// 密钥可以为空，本地部署的兼容接口通常不需要鉴权。
    pub fn has_model(&self) -> bool {
        !self.api_model.trim().is_empty()
    }
}

/// 批量翻译接口的提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TranslationApiType {
    #[serde(rename = "translation_api_deepl")]
    DeepL,
}

impl TranslationApiType {
    /// 在合并目录中的 `type` 键
    pub fn type_key(&self) -> &'static str {
        match self {
            TranslationApiType::DeepL => constants::DEEPL_API_TYPE,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TranslationApiType::DeepL => "DeepL",
        }
    }
}

/// 用户配置的批量翻译接口
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranslationApiConfig {
    pub api_type: TranslationApiType,
    pub api_uri: String,
    pub api_key: String,
    #[serde(default)]
    pub deepl_prefer_quality_optimized: bool,
}

/// 引擎配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    // 服务配置
    pub service_url: String,
    pub request_timeout_secs: u64,

    // 后端配置
    pub chat_api_configs: Vec<ChatApiConfig>,
    pub translation_api_configs: Vec<TranslationApiConfig>,

    // 对话模型参数
    pub translation_system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,

    // 排版
    pub keep_layout: bool,
    pub optimize_ai_translation_layout: bool,

    // 调度
    pub debounce_ms: u64,
    pub settle_delay_ms: u64,

    // 上次使用的选择
    pub selection: Selection,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_url: constants::DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),

            chat_api_configs: Vec::new(),
            translation_api_configs: Vec::new(),

            translation_system_prompt: constants::DEFAULT_TRANSLATION_PROMPT.to_string(),
            max_tokens: constants::DEFAULT_MAX_TOKENS,
            temperature: constants::DEFAULT_TEMPERATURE,

            keep_layout: false,
            optimize_ai_translation_layout: false,

            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            settle_delay_ms: constants::DEFAULT_SETTLE_DELAY.as_millis() as u64,

            selection: Selection::default(),
        }
    }
}

impl EngineConfig {
    /// 创建带指定服务地址的默认配置
    pub fn with_service_url(service_url: &str) -> Self {
        Self {
            service_url: service_url.to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.service_url.trim().is_empty() {
            return Err(TranslationError::ConfigError("服务地址不能为空".to_string()));
        }
        url::Url::parse(&self.service_url)?;

        if self.max_tokens == 0 {
            return Err(TranslationError::ConfigError("max_tokens 不能为0".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TranslationError::ConfigError(
                "temperature 必须在 0 到 2 之间".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslationError::ConfigError("请求超时不能为0".to_string()));
        }

        for api in &self.translation_api_configs {
            if api.api_uri.trim().is_empty() {
                return Err(TranslationError::ConfigError(format!(
                    "{} 接口地址不能为空",
                    api.api_type.display_name()
                )));
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        let env = match crate::env::EnvConfig::from_env() {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!("忽略无效的环境变量覆盖: {}", e);
                return;
            }
        };

        if let Some(url) = env.service_url {
            tracing::info!("环境变量覆盖服务地址: {}", url);
            self.service_url = url;
        }
        if let Some(max_tokens) = env.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = env.temperature {
            self.temperature = temperature;
        }
        if let Some(debounce) = env.debounce_ms {
            self.debounce_ms = debounce;
        }
        if let Some(timeout) = env.request_timeout {
            self.request_timeout_secs = timeout.as_secs();
        }
        if let Some(keep_layout) = env.keep_layout {
            self.keep_layout = keep_layout;
        }
    }

    /// 转换为Duration类型
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// 读取当前设置
///
/// 宿主应用的设置存储实现这个 trait，引擎每次调度时读取最新快照。
pub trait SettingsProvider: Send + Sync {
    fn current(&self) -> EngineConfig;
}

/// 内存中的设置，可在运行时替换
#[derive(Debug, Default)]
pub struct StaticSettings {
    config: RwLock<EngineConfig>,
}

impl StaticSettings {
    pub fn new(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(config),
        })
    }

    /// 替换设置
    pub fn replace(&self, config: EngineConfig) {
        match self.config.write() {
            Ok(mut guard) => *guard = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }

    /// 原地修改设置
    pub fn update(&self, f: impl FnOnce(&mut EngineConfig)) {
        match self.config.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn current(&self) -> EngineConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: EngineConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> TranslationResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 从指定文件创建
    pub fn from_file(path: &str) -> TranslationResult<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    /// 从文件加载配置
    fn load_config() -> TranslationResult<EngineConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(EngineConfig::default())
    }

    /// 从指定文件加载配置，格式由扩展名决定
    fn load_from_file(path: &str) -> TranslationResult<EngineConfig> {
        let format = if path.ends_with(".json") {
            config::FileFormat::Json
        } else {
            config::FileFormat::Toml
        };

        let settings = config::Config::builder()
            .add_source(config::File::new(path, format))
            .build()?;

        Ok(settings.try_deserialize::<EngineConfig>()?)
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> TranslationResult<()> {
        let config = EngineConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

impl SettingsProvider for ConfigManager {
    fn current(&self) -> EngineConfig {
        self.config.clone()
    }
}
