//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "TRANSLATION_ENGINE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译引擎相关环境变量
///
/// 未设置时 `get()` 返回错误，配置保持文件或默认值。
pub mod engine {
    use super::*;

    /// 官方服务地址
    pub struct ServiceUrl;
    impl EnvVar<String> for ServiceUrl {
        const NAME: &'static str = "TRANSLATION_ENGINE_SERVICE_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the official translation service";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Service URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 对话模型最大输出 token 数
    pub struct MaxTokens;
    impl EnvVar<u32> for MaxTokens {
        const NAME: &'static str = "TRANSLATION_ENGINE_MAX_TOKENS";
        const DEFAULT: Option<u32> = None;
        const DESCRIPTION: &'static str = "max_completion_tokens for chat-model backends";

        fn parse(value: &str) -> EnvResult<u32> {
            parse_bounded_u64(value, Self::NAME, 1, 1_000_000).map(|v| v as u32)
        }
    }

    /// 采样温度
    pub struct Temperature;
    impl EnvVar<f32> for Temperature {
        const NAME: &'static str = "TRANSLATION_ENGINE_TEMPERATURE";
        const DEFAULT: Option<f32> = None;
        const DESCRIPTION: &'static str = "Sampling temperature for chat-model backends (0-2)";

        fn parse(value: &str) -> EnvResult<f32> {
            let temperature: f32 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number".to_string(),
            })?;

            if !(0.0..=2.0).contains(&temperature) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Temperature must be between 0 and 2".to_string(),
                });
            }

            Ok(temperature)
        }
    }

    /// 防抖静默时间（毫秒）
    pub struct DebounceMs;
    impl EnvVar<u64> for DebounceMs {
        const NAME: &'static str = "TRANSLATION_ENGINE_DEBOUNCE_MS";
        const DEFAULT: Option<u64> = None;
        const DESCRIPTION: &'static str = "Quiet period before a debounced translation dispatches";

        fn parse(value: &str) -> EnvResult<u64> {
            parse_bounded_u64(value, Self::NAME, 0, 60_000)
        }
    }

    /// 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "TRANSLATION_ENGINE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Backend request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_bounded_u64(value, Self::NAME, 1, 600).map(Duration::from_secs)
        }
    }

    /// 保留排版
    pub struct KeepLayout;
    impl EnvVar<bool> for KeepLayout {
        const NAME: &'static str = "TRANSLATION_ENGINE_KEEP_LAYOUT";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str = "Use JSON keep-layout framing for chat-model backends";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_bounded_u64(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<u64> {
    let num: u64 = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub log_level: String,
    pub service_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub debounce_ms: Option<u64>,
    pub request_timeout: Option<Duration>,
    pub keep_layout: Option<bool>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    ///
    /// 已设置但无效的变量返回错误，未设置的变量为 `None`。
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: core::LogLevel::get()?,
            service_url: optional::<engine::ServiceUrl, _>()?,
            max_tokens: optional::<engine::MaxTokens, _>()?,
            temperature: optional::<engine::Temperature, _>()?,
            debounce_ms: optional::<engine::DebounceMs, _>()?,
            request_timeout: optional::<engine::RequestTimeout, _>()?,
            keep_layout: optional::<engine::KeepLayout, _>()?,
        })
    }
}

fn optional<V: EnvVar<T>, T>() -> EnvResult<Option<T>> {
    match env::var(V::NAME) {
        Ok(value) => V::parse(&value).map(Some),
        Err(_) => Ok(None),
    }
}

/// 生成环境变量文档
pub fn generate_env_docs() -> String {
    fn row<V: EnvVar<T>, T>(out: &mut String) {
        out.push_str(&format!("| `{}` | {} |\n", V::NAME, V::DESCRIPTION));
    }

    let mut out = String::from("| Variable | Description |\n|---|---|\n");
    row::<core::LogLevel, String>(&mut out);
    row::<engine::ServiceUrl, String>(&mut out);
    row::<engine::MaxTokens, u32>(&mut out);
    row::<engine::Temperature, f32>(&mut out);
    row::<engine::DebounceMs, u64>(&mut out);
    row::<engine::RequestTimeout, Duration>(&mut out);
    row::<engine::KeepLayout, bool>(&mut out);
    out
}
