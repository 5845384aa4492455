//! 翻译后端
//!
//! 三类后端的线协议互不兼容：
//!
//! - **legacy**: 官方服务的旧版翻译接口，按类型编号区分引擎
//! - **chat**: OpenAI 兼容的流式对话接口（官方模型或用户自定义接口）
//! - **batch**: DeepL 形式的批量 REST 接口
//!
//! 调度器按 [`BackendDescriptor`] 的变体穷举匹配到对应的适配器。

pub mod batch;
pub mod chat;
pub mod language;
pub mod legacy;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::translation::config::{constants, SettingsProvider, TranslationApiType};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::DeltaCallback;
use crate::translation::types::{TranslationOutput, TranslationRequest};

pub use batch::BatchApiAdapter;
pub use chat::ChatModelAdapter;
pub use legacy::LegacyAdapter;

/// 合并目录中的一个后端
#[derive(Debug, Clone, PartialEq)]
pub enum BackendDescriptor {
    /// 官方旧版翻译类型
    OfficialLegacy { id: i64, name: String },
    /// 官方对话模型
    OfficialChatModel { model_id: String, display_name: String },
    /// 用户配置的 OpenAI 兼容接口
    CustomChatModel {
        endpoint: String,
        api_key: String,
        model_id: String,
        display_name: String,
    },
    /// 用户配置的批量翻译接口
    CustomBatchApi {
        provider_kind: TranslationApiType,
        endpoint: String,
        api_key: String,
        prefer_quality: bool,
    },
}

impl BackendDescriptor {
    /// 在合并目录中唯一的选择键
    pub fn type_key(&self) -> String {
        match self {
            BackendDescriptor::OfficialLegacy { id, .. } => id.to_string(),
            BackendDescriptor::OfficialChatModel { model_id, .. } => model_id.clone(),
            BackendDescriptor::CustomChatModel { model_id, .. } => {
                format!("{}{}", constants::CUSTOM_MODEL_PREFIX, model_id)
            }
            BackendDescriptor::CustomBatchApi { provider_kind, .. } => {
                provider_kind.type_key().to_string()
            }
        }
    }

    pub fn is_official(&self) -> bool {
        matches!(
            self,
            BackendDescriptor::OfficialLegacy { .. } | BackendDescriptor::OfficialChatModel { .. }
        )
    }

    pub fn display_name(&self) -> &str {
        match self {
            BackendDescriptor::OfficialLegacy { name, .. } => name,
            BackendDescriptor::OfficialChatModel { display_name, .. } => display_name,
            BackendDescriptor::CustomChatModel { display_name, .. } => display_name,
            BackendDescriptor::CustomBatchApi { provider_kind, .. } => provider_kind.display_name(),
        }
    }

    /// 批量接口不接受领域参数
    pub fn supports_domain(&self) -> bool {
        !matches!(self, BackendDescriptor::CustomBatchApi { .. })
    }

    pub fn is_chat_model(&self) -> bool {
        matches!(
            self,
            BackendDescriptor::OfficialChatModel { .. } | BackendDescriptor::CustomChatModel { .. }
        )
    }
}

/// 后端适配器
///
/// 适配器把 [`TranslationRequest`] 翻译成各自的线协议。`on_delta` 只对流式后端有意义。
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// 适配器名称，用于日志
    fn name(&self) -> &'static str;

    async fn translate(
        &self,
        request: &TranslationRequest,
        on_delta: DeltaCallback,
    ) -> TranslationResult<TranslationOutput>;
}

/// 三类适配器的集合
#[derive(Clone)]
pub struct AdapterSet {
    pub legacy: Arc<dyn BackendAdapter>,
    pub chat: Arc<dyn BackendAdapter>,
    pub batch: Arc<dyn BackendAdapter>,
}

impl AdapterSet {
    /// 基于 reqwest 的默认适配器
    pub fn http(settings: Arc<dyn SettingsProvider>) -> TranslationResult<Self> {
        let client = build_http_client(settings.current().request_timeout())?;

        Ok(Self {
            legacy: Arc::new(LegacyAdapter::new(client.clone(), settings.clone())),
            chat: Arc::new(ChatModelAdapter::new(client.clone(), settings)),
            batch: Arc::new(BatchApiAdapter::new(client)),
        })
    }

    /// 按描述符的变体选择适配器
    pub fn adapter_for(&self, descriptor: &BackendDescriptor) -> &Arc<dyn BackendAdapter> {
        match descriptor {
            BackendDescriptor::OfficialLegacy { .. } => &self.legacy,
            BackendDescriptor::OfficialChatModel { .. } => &self.chat,
            BackendDescriptor::CustomChatModel { .. } => &self.chat,
            BackendDescriptor::CustomBatchApi { .. } => &self.batch,
        }
    }
}

/// 创建共享的 HTTP 客户端
pub fn build_http_client(timeout: Duration) -> TranslationResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))
}

/// 把相对路径拼到服务地址上，服务地址缺少结尾的 `/` 时自动补上
pub fn service_endpoint(service_url: &str, path: &str) -> TranslationResult<url::Url> {
    let mut base = service_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(url::Url::parse(&base)?.join(path)?)
}

/// 非 2xx 响应转换为传输错误
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    backend: &str,
) -> TranslationResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TranslationError::TransportError(format!(
        "{} 返回 HTTP {}: {}",
        backend,
        status.as_u16(),
        body.chars().take(200).collect::<String>()
    )))
}

/// 结果数量与请求不一致时给出警告
pub(crate) fn count_warning(expected: usize, actual: usize) -> Option<TranslationError> {
    (expected != actual).then(|| {
        tracing::warn!("后端返回的结果数量不匹配: 期望 {}，得到 {}", expected, actual);
        TranslationError::DecodeMismatch { expected, actual }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_chat() -> BackendDescriptor {
        BackendDescriptor::CustomChatModel {
            endpoint: "https://api.example.com/v1".into(),
            api_key: "sk".into(),
            model_id: "gpt-4o-mini".into(),
            display_name: "Mine".into(),
        }
    }

    #[test]
    fn test_type_keys_never_collide() {
        let official = BackendDescriptor::OfficialChatModel {
            model_id: "gpt-4o-mini".into(),
            display_name: "GPT".into(),
        };
        assert_ne!(official.type_key(), custom_chat().type_key());
        assert_eq!(custom_chat().type_key(), "custom_model/gpt-4o-mini");

        let legacy = BackendDescriptor::OfficialLegacy { id: 3, name: "Qwen Plus".into() };
        assert_eq!(legacy.type_key(), "3");
        assert!(legacy.is_official());
        assert!(!custom_chat().is_official());
    }

    #[test]
    fn test_domain_support() {
        let deepl = BackendDescriptor::CustomBatchApi {
            provider_kind: TranslationApiType::DeepL,
            endpoint: "https://api-free.deepl.com/v2/translate".into(),
            api_key: "k".into(),
            prefer_quality: false,
        };
        assert!(!deepl.supports_domain());
        assert_eq!(deepl.display_name(), "DeepL");
        assert_eq!(deepl.type_key(), "translation_api_deepl");
        assert!(custom_chat().supports_domain());
    }

    #[test]
    fn test_service_endpoint_join() {
        let url = service_endpoint("https://svc.example.com/base", "api/v1/chat/models").unwrap();
        assert_eq!(url.as_str(), "https://svc.example.com/base/api/v1/chat/models");

        let url = service_endpoint("https://svc.example.com/", constants::TRANSLATE_PATH).unwrap();
        assert_eq!(url.as_str(), "https://svc.example.com/api/v1/translation/translate");
    }
}
