//! 后端目录
//!
//! 官方目录（旧版翻译类型、对话模型）从服务端拉取后缓存在 [`CatalogCache`] 中，
//! 与用户配置的自定义后端合并成一个列表供调度器按 `type` 键查找。
//!
//! ## 加载规则
//!
//! - 两个目录都已填充时立即返回
//! - 并发调用共享同一个加载操作，每类目录只拉取一次
//! - 拉取失败的目录置为空列表，不自动重试，也不影响另一个目录
//! - 第一次填充的结果在缓存生命周期内保持不变

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::translation::backends::{service_endpoint, BackendDescriptor};
use crate::translation::config::{constants, EngineConfig, SettingsProvider};
use crate::translation::error::{helpers, TranslationError, TranslationResult};

/// 官方旧版翻译类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationTypeOption {
    #[serde(rename = "type")]
    pub type_id: i64,
    pub name: String,
}

/// 官方对话模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatModelOption {
    pub model: String,
    pub name: String,
    #[serde(default)]
    pub thinking: bool,
    #[serde(default)]
    pub support_vision: bool,
}

/// 官方目录的来源
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_translation_types(&self) -> TranslationResult<Vec<TranslationTypeOption>>;
    async fn fetch_chat_models(&self) -> TranslationResult<Vec<ChatModelOption>>;
}

/// 从官方服务拉取目录
pub struct HttpCatalogSource {
    client: reqwest::Client,
    settings: Arc<dyn SettingsProvider>,
}

impl HttpCatalogSource {
    pub fn new(client: reqwest::Client, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { client, settings }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> TranslationResult<T> {
        let url = service_endpoint(&self.settings.current().service_url, path)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::CatalogFetchFailed(format!(
                "{} 返回 HTTP {}",
                path,
                status.as_u16()
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_translation_types(&self) -> TranslationResult<Vec<TranslationTypeOption>> {
        self.get_json(constants::TRANSLATION_TYPES_PATH).await
    }

    async fn fetch_chat_models(&self) -> TranslationResult<Vec<ChatModelOption>> {
        self.get_json(constants::CHAT_MODELS_PATH).await
    }
}

type PendingLoad = Shared<BoxFuture<'static, ()>>;

#[derive(Default)]
struct CatalogState {
    official_legacy_types: Option<Vec<TranslationTypeOption>>,
    official_chat_models: Option<Vec<ChatModelOption>>,
    in_flight: Option<PendingLoad>,
}

impl CatalogState {
    fn is_loaded(&self) -> bool {
        self.official_legacy_types.is_some() && self.official_chat_models.is_some()
    }
}

/// 官方目录缓存
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    state: Mutex<CatalogState>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Arc<Self> {
        Arc::new(Self {
            source,
            state: Mutex::new(CatalogState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_loaded()
    }

    /// 是否有加载操作正在进行
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// 确保两个官方目录都已加载
    pub async fn ensure_catalogs_loaded(self: &Arc<Self>) {
        let pending = {
            let mut state = self.lock();
            if state.is_loaded() {
                return;
            }

            match &state.in_flight {
                Some(pending) => pending.clone(),
                None => {
                    let cache = Arc::clone(self);
                    let pending = async move { cache.load_missing().await }.boxed().shared();
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await;
    }

    async fn load_missing(&self) {
        let (need_types, need_models) = {
            let state = self.lock();
            (
                state.official_legacy_types.is_none(),
                state.official_chat_models.is_none(),
            )
        };

        tracing::info!("加载官方后端目录");

        let types = async {
            if need_types {
                Some(self.source.fetch_translation_types().await)
            } else {
                None
            }
        };
        let models = async {
            if need_models {
                Some(self.source.fetch_chat_models().await)
            } else {
                None
            }
        };
        let (types, models) = futures::join!(types, models);

        let mut state = self.lock();
        if let Some(result) = types {
            let list = settle("翻译类型", result);
            if state.official_legacy_types.is_none() {
                state.official_legacy_types = Some(list);
            }
        }
        if let Some(result) = models {
            let list = settle("对话模型", result);
            if state.official_chat_models.is_none() {
                state.official_chat_models = Some(list);
            }
        }
        state.in_flight = None;

        tracing::info!(
            "官方后端目录已加载: {} 个翻译类型，{} 个对话模型",
            state.official_legacy_types.as_ref().map_or(0, Vec::len),
            state.official_chat_models.as_ref().map_or(0, Vec::len)
        );
    }

    /// 已加载的旧版翻译类型，未加载时为空
    pub fn official_legacy_types(&self) -> Vec<TranslationTypeOption> {
        self.lock().official_legacy_types.clone().unwrap_or_default()
    }

    /// 已加载的官方对话模型，未加载时为空
    pub fn official_chat_models(&self) -> Vec<ChatModelOption> {
        self.lock().official_chat_models.clone().unwrap_or_default()
    }
}

/// 失败的目录记为空列表
fn settle<T>(label: &str, result: TranslationResult<Vec<T>>) -> Vec<T> {
    match result {
        Ok(list) => list,
        Err(e) => {
            let error = if matches!(e, TranslationError::CatalogFetchFailed(_)) {
                e
            } else {
                TranslationError::CatalogFetchFailed(e.to_string())
            };
            helpers::log_error(&error.with_context(label));
            Vec::new()
        }
    }
}

/// 后端选项分组
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendGroup {
    Custom,
    Official,
}

/// 提供给界面的后端选项
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOption {
    pub type_key: String,
    pub display_name: String,
    pub supports_domain: bool,
}

/// 合并用户配置与官方目录
#[derive(Clone)]
pub struct BackendCatalogResolver {
    cache: Arc<CatalogCache>,
}

impl BackendCatalogResolver {
    pub fn new(cache: Arc<CatalogCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    pub async fn ensure_catalogs_loaded(&self) {
        self.cache.ensure_catalogs_loaded().await;
    }

    /// 合并后的后端列表
    ///
    /// 顺序：自定义对话模型、自定义批量接口、官方旧版翻译类型、官方对话模型。
    pub fn resolve(&self, config: &EngineConfig) -> Vec<BackendDescriptor> {
        let custom_chat = config
            .chat_api_configs
            .iter()
            .filter(|c| c.has_model())
            .map(|c| BackendDescriptor::CustomChatModel {
                endpoint: c.api_uri.clone(),
                api_key: c.api_key.clone(),
                model_id: c
                    .api_model
                    .strip_prefix(constants::CUSTOM_MODEL_PREFIX)
                    .unwrap_or(&c.api_model)
                    .to_string(),
                display_name: c.model_name.clone(),
            });

        let custom_batch = config
            .translation_api_configs
            .iter()
            .map(|c| BackendDescriptor::CustomBatchApi {
                provider_kind: c.api_type,
                endpoint: c.api_uri.clone(),
                api_key: c.api_key.clone(),
                prefer_quality: c.deepl_prefer_quality_optimized,
            });

        let official_legacy = self
            .cache
            .official_legacy_types()
            .into_iter()
            .map(|t| BackendDescriptor::OfficialLegacy {
                id: t.type_id,
                name: t.name,
            });

        let official_chat = self
            .cache
            .official_chat_models()
            .into_iter()
            .map(|m| BackendDescriptor::OfficialChatModel {
                model_id: m.model,
                display_name: m.name,
            });

        custom_chat
            .chain(custom_batch)
            .chain(official_legacy)
            .chain(official_chat)
            .collect()
    }

    /// 按 `type` 键查找后端，重复时取第一个
    pub fn find(&self, config: &EngineConfig, type_key: &str) -> Option<BackendDescriptor> {
        self.resolve(config)
            .into_iter()
            .find(|descriptor| descriptor.type_key() == type_key)
    }

    /// 按自定义和官方分组的选项，空分组不返回
    pub fn backend_options(&self, config: &EngineConfig) -> Vec<(BackendGroup, Vec<BackendOption>)> {
        let (custom, official): (Vec<_>, Vec<_>) = self
            .resolve(config)
            .into_iter()
            .partition(|descriptor| !descriptor.is_official());

        let to_options = |descriptors: Vec<BackendDescriptor>| -> Vec<BackendOption> {
            descriptors
                .iter()
                .map(|d| BackendOption {
                    type_key: d.type_key(),
                    display_name: d.display_name().to_string(),
                    supports_domain: d.supports_domain(),
                })
                .collect()
        };

        [
            (BackendGroup::Custom, to_options(custom)),
            (BackendGroup::Official, to_options(official)),
        ]
        .into_iter()
        .filter(|(_, options)| !options.is_empty())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::config::{ChatApiConfig, TranslationApiConfig, TranslationApiType};

    struct FixedSource;

    #[async_trait]
    impl CatalogSource for FixedSource {
        async fn fetch_translation_types(&self) -> TranslationResult<Vec<TranslationTypeOption>> {
            Ok(vec![TranslationTypeOption { type_id: 0, name: "Youdao".into() }])
        }

        async fn fetch_chat_models(&self) -> TranslationResult<Vec<ChatModelOption>> {
            Err(TranslationError::TransportError("503".into()))
        }
    }

    fn config_with_custom_backends() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.chat_api_configs = vec![
            ChatApiConfig {
                api_uri: "https://api.example.com/v1".into(),
                api_key: "sk".into(),
                api_model: "gpt-4o-mini".into(),
                model_name: "Mine".into(),
            },
            // 缺少模型，应被过滤
            ChatApiConfig {
                api_uri: "https://api.example.com/v1".into(),
                api_key: "sk".into(),
                api_model: String::new(),
                model_name: "Broken".into(),
            },
        ];
        config.translation_api_configs = vec![TranslationApiConfig {
            api_type: TranslationApiType::DeepL,
            api_uri: "https://api-free.deepl.com/v2/translate".into(),
            api_key: "key".into(),
            deepl_prefer_quality_optimized: true,
        }];
        config
    }

    #[tokio::test]
    async fn test_resolution_order_and_failed_catalog() {
        let cache = CatalogCache::new(Arc::new(FixedSource));
        let resolver = BackendCatalogResolver::new(cache.clone());
        resolver.ensure_catalogs_loaded().await;

        assert!(cache.is_loaded());
        assert!(cache.official_chat_models().is_empty());

        let keys: Vec<String> = resolver
            .resolve(&config_with_custom_backends())
            .iter()
            .map(|d| d.type_key())
            .collect();
        assert_eq!(keys, vec!["custom_model/gpt-4o-mini", "translation_api_deepl", "0"]);
    }

    #[tokio::test]
    async fn test_backend_options_grouping() {
        let cache = CatalogCache::new(Arc::new(FixedSource));
        let resolver = BackendCatalogResolver::new(cache);
        resolver.ensure_catalogs_loaded().await;

        let groups = resolver.backend_options(&config_with_custom_backends());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, BackendGroup::Custom);
        assert_eq!(groups[0].1[1].display_name, "DeepL");
        assert!(!groups[0].1[1].supports_domain);
        assert_eq!(groups[1].1[0].display_name, "Youdao");

        let only_official = resolver.backend_options(&EngineConfig::default());
        assert_eq!(only_official.len(), 1);
        assert_eq!(only_official[0].0, BackendGroup::Official);
    }

    #[test]
    fn test_unloaded_cache_resolves_custom_only() {
        let resolver = BackendCatalogResolver::new(CatalogCache::new(Arc::new(FixedSource)));
        assert_eq!(resolver.resolve(&config_with_custom_backends()).len(), 2);
        assert!(resolver.find(&EngineConfig::default(), "0").is_none());
    }
}
