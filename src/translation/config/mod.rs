//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{
    ChatApiConfig, ConfigManager, EngineConfig, SettingsProvider, StaticSettings,
    TranslationApiConfig, TranslationApiType,
};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 调度相关
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);
    /// 一帧，立即触发前给依赖状态留出的稳定时间
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(17);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    // 对话模型参数
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;
    pub const DEFAULT_TEMPERATURE: f32 = 1.0;

    // 默认选择
    pub const DEFAULT_SOURCE_LANGUAGE: &str = "auto";
    pub const DEFAULT_TARGET_LANGUAGE: &str = "zh-CHS";
    pub const DEFAULT_TRANSLATION_TYPE: &str = "0";

    // 服务端点
    pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8080/";
    pub const TRANSLATE_PATH: &str = "api/v1/translation/translate";
    pub const TRANSLATION_TYPES_PATH: &str = "api/v1/translation/types";
    pub const CHAT_MODELS_PATH: &str = "api/v1/chat/models";
    pub const OFFICIAL_CHAT_BASE_PATH: &str = "api/v1/";

    // 后端标识
    pub const CUSTOM_MODEL_PREFIX: &str = "custom_model/";
    pub const DEEPL_API_TYPE: &str = "translation_api_deepl";

    // 分段格式
    pub const SEGMENT_DELIMITER: &str = "%%";
    pub const KEEP_LAYOUT_KEY_PREFIX: &str = "line";

    // 提示词占位符
    pub const SOURCE_LANGUAGE_PLACEHOLDER: &str = "{{SOURCE_LANGUAGE}}";
    pub const TARGET_LANGUAGE_PLACEHOLDER: &str = "{{TARGET_LANGUAGE}}";
    pub const TRANSLATION_DOMAIN_PLACEHOLDER: &str = "{{TRANSLATION_DOMAIN}}";

    pub const DEFAULT_TRANSLATION_PROMPT: &str = r#"You are a professional translation engine, dedicated to delivering high-quality {{SOURCE_LANGUAGE}} → {{TARGET_LANGUAGE}} translations. Your sole objective is to translate content accurately while preserving its original meaning, nuances, and context.

## Translation Rules (must keep)
1. Output only the translation, without explanations or any other content (e.g., "Here is the translation:" or "Translation:").
2. Preserve exactly the same number of text segments and formatting as the original. When the input contains multiple segments separated by %%, use %% in the output to separate each translated segment accordingly.
3. Accurately convey the original meaning, tone, and intent.
4. Preserve content that should not be translated (e.g., proper nouns, brand names, code snippets, etc.).
5. Apply domain-specific terminology appropriate to the {{TRANSLATION_DOMAIN}} field; avoid generic translations of specialist terms.
6. Preserve all numbers, dates, units of measurement, and other critical information without alteration.
7. For ambiguous terms or phrases, choose the translation that best aligns with the overall context and topic.
8. Maintain the original level of formality, technical complexity, and tone.
9. If the detected source language matches the {{TARGET_LANGUAGE}}, output the original text unchanged.

## Output Format (must keep)
- Use %% as the separator between translated segments
- Each %% should appear on its own line
- Preserve all line breaks and spacing from the original

## Priority
Priority order (highest to lowest):
1. Output Format rules
2. Translation Rules
3. Domain-specific conventions

## Examples
### Example 1: Multi-paragraph translation
**Input:**
Paragraph_1
%%
Paragraph_2
%%
Paragraph_3

**Output:**
Paragraph_1
%%
Paragraph_2
%%
Paragraph_3"#;

    /// 保留排版模式下追加到系统提示词末尾
    pub const KEEP_LAYOUT_PROMPT_SUFFIX: &str = r#"

## Layout mode
The input is a JSON object whose keys are line1, line2, ... Translate every value and answer with a JSON object that has exactly the same keys in the same order. Do not translate the keys."#;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "translation-engine.toml",
        "translation-engine.json",
        ".translation-engine.toml",
        "~/.config/translation-engine/config.toml",
        "/etc/translation-engine/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时退回默认值
pub fn load_engine_config() -> EngineConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.get_config().clone(),
        Err(e) => {
            tracing::warn!("创建配置管理器失败，使用默认配置: {}", e);
            EngineConfig::default()
        }
    }
}
