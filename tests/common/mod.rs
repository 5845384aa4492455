// 集成测试公共模块
//
// 提供可控的假适配器、计数的目录来源和配置构建器

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use translation_engine::translation::backends::{AdapterSet, BackendAdapter};
use translation_engine::translation::config::{
    ChatApiConfig, EngineConfig, StaticSettings, TranslationApiConfig, TranslationApiType,
};
use translation_engine::translation::error::{TranslationError, TranslationResult};
use translation_engine::translation::pipeline::DeltaCallback;
use translation_engine::translation::storage::{
    CatalogCache, CatalogSource, ChatModelOption, TranslationTypeOption,
};
use translation_engine::translation::types::{Segment, TranslationOutput, TranslationRequest};

/// 官方旧版翻译类型
pub fn legacy_types() -> Vec<TranslationTypeOption> {
    [(0, "Youdao"), (1, "DeepSeek"), (2, "Qwen Turbo"), (3, "Qwen Plus"), (4, "Qwen Max")]
        .into_iter()
        .map(|(type_id, name)| TranslationTypeOption {
            type_id,
            name: name.to_string(),
        })
        .collect()
}

/// 官方对话模型
pub fn chat_models() -> Vec<ChatModelOption> {
    vec![ChatModelOption {
        model: "deepseek-chat".to_string(),
        name: "DeepSeek V3".to_string(),
        thinking: false,
        support_vision: false,
    }]
}

/// 计数的目录来源，每次拉取前可以等待一段时间以制造并发
pub struct CountingCatalogSource {
    pub type_fetches: AtomicUsize,
    pub model_fetches: AtomicUsize,
    pub delay: Duration,
    pub fail_types: bool,
    pub fail_models: bool,
}

impl CountingCatalogSource {
    pub fn new() -> Arc<Self> {
        Self::with(Duration::ZERO, false, false)
    }

    pub fn with(delay: Duration, fail_types: bool, fail_models: bool) -> Arc<Self> {
        Arc::new(Self {
            type_fetches: AtomicUsize::new(0),
            model_fetches: AtomicUsize::new(0),
            delay,
            fail_types,
            fail_models,
        })
    }

    pub fn type_fetches(&self) -> usize {
        self.type_fetches.load(Ordering::SeqCst)
    }

    pub fn model_fetches(&self) -> usize {
        self.model_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for CountingCatalogSource {
    async fn fetch_translation_types(&self) -> TranslationResult<Vec<TranslationTypeOption>> {
        self.type_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail_types {
            return Err(TranslationError::TransportError("connection refused".into()));
        }
        Ok(legacy_types())
    }

    async fn fetch_chat_models(&self) -> TranslationResult<Vec<ChatModelOption>> {
        self.model_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail_models {
            return Err(TranslationError::TransportError("HTTP 503".into()));
        }
        Ok(chat_models())
    }
}

/// 立即返回的假适配器，把每个片段加上前缀
///
/// `streaming` 为真时先逐段推送增量。
pub struct EchoAdapter {
    pub prefix: String,
    pub streaming: bool,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<TranslationRequest>>,
    pub response: Mutex<Option<Vec<String>>>,
    pub warning: Mutex<Option<TranslationError>>,
}

impl EchoAdapter {
    pub fn new(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.to_string(),
            streaming: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(None),
            warning: Mutex::new(None),
        })
    }

    pub fn streaming(prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            prefix: prefix.to_string(),
            streaming: true,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            response: Mutex::new(None),
            warning: Mutex::new(None),
        })
    }

    /// 固定返回的片段，忽略输入
    pub fn respond_with(&self, segments: &[&str]) {
        *self.response.lock().unwrap() = Some(segments.iter().map(|s| s.to_string()).collect());
    }

    /// 随结果一起返回的警告
    pub fn warn_with(&self, warning: TranslationError) {
        *self.warning.lock().unwrap() = Some(warning);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TranslationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl BackendAdapter for EchoAdapter {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
        mut on_delta: DeltaCallback,
    ) -> TranslationResult<TranslationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let fixed = self.response.lock().unwrap().clone();
        let segments: Vec<String> = fixed.unwrap_or_else(|| {
            request
                .segments
                .iter()
                .map(|s| format!("{}{}", self.prefix, s))
                .collect()
        });

        if self.streaming {
            for segment in &segments {
                on_delta(segment.as_str());
            }
        }

        let mut output = TranslationOutput::new(
            request.request_id,
            segments.into_iter().map(Segment::new).collect(),
        );
        output.warning = self.warning.lock().unwrap().clone();
        Ok(output)
    }
}

type PendingReply = oneshot::Sender<TranslationResult<Vec<String>>>;

/// 由测试决定何时完成的假适配器
pub struct ControlledAdapter {
    pub calls: AtomicUsize,
    pending: Mutex<HashMap<u64, PendingReply>>,
}

impl ControlledAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// 等待指定数量的请求到达适配器
    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..1000 {
            if self.pending.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("adapter never received {} calls", count);
    }

    /// 以给定片段完成某个请求
    pub fn complete(&self, request_id: u64, segments: &[&str]) {
        let reply = self
            .pending
            .lock()
            .unwrap()
            .remove(&request_id)
            .expect("request is pending");
        let _ = reply.send(Ok(segments.iter().map(|s| s.to_string()).collect()));
    }

    /// 以错误完成某个请求
    pub fn fail(&self, request_id: u64, error: TranslationError) {
        let reply = self
            .pending
            .lock()
            .unwrap()
            .remove(&request_id)
            .expect("request is pending");
        let _ = reply.send(Err(error));
    }
}

#[async_trait]
impl BackendAdapter for ControlledAdapter {
    fn name(&self) -> &'static str {
        "controlled"
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
        _on_delta: DeltaCallback,
    ) -> TranslationResult<TranslationOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(request.request_id, tx);

        let segments = rx
            .await
            .map_err(|_| TranslationError::InternalError("reply dropped".into()))??;

        Ok(TranslationOutput::new(
            request.request_id,
            segments.into_iter().map(Segment::new).collect(),
        ))
    }
}

/// 三类后端使用同一个适配器
pub fn uniform_adapters(adapter: Arc<dyn BackendAdapter>) -> AdapterSet {
    AdapterSet {
        legacy: adapter.clone(),
        chat: adapter.clone(),
        batch: adapter,
    }
}

/// 已加载官方目录的缓存
pub async fn loaded_catalog() -> Arc<CatalogCache> {
    let cache = CatalogCache::new(CountingCatalogSource::new());
    cache.ensure_catalogs_loaded().await;
    cache
}

/// 测试配置构建器
pub struct TestConfigBuilder {
    config: EngineConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn service_url(mut self, url: &str) -> Self {
        self.config.service_url = url.to_string();
        self
    }

    pub fn translation_type(mut self, type_key: &str) -> Self {
        self.config.selection.translation_type = type_key.to_string();
        self
    }

    pub fn languages(mut self, source: &str, target: &str) -> Self {
        self.config.selection.source_language = source.to_string();
        self.config.selection.target_language = target.to_string();
        self
    }

    pub fn custom_chat(mut self, api_uri: &str, api_model: &str, model_name: &str) -> Self {
        self.config.chat_api_configs.push(ChatApiConfig {
            api_uri: api_uri.to_string(),
            api_key: "sk-test".to_string(),
            api_model: api_model.to_string(),
            model_name: model_name.to_string(),
        });
        self
    }

    /// 不需要鉴权的本地兼容接口，只填写地址和模型
    pub fn keyless_chat(mut self, api_uri: &str, api_model: &str) -> Self {
        self.config.chat_api_configs.push(ChatApiConfig {
            api_uri: api_uri.to_string(),
            api_model: api_model.to_string(),
            ..ChatApiConfig::default()
        });
        self
    }

    pub fn deepl(mut self, api_uri: &str, prefer_quality: bool) -> Self {
        self.config.translation_api_configs.push(TranslationApiConfig {
            api_type: TranslationApiType::DeepL,
            api_uri: api_uri.to_string(),
            api_key: "deepl-key".to_string(),
            deepl_prefer_quality_optimized: prefer_quality,
        });
        self
    }

    pub fn keep_layout(mut self, enabled: bool) -> Self {
        self.config.keep_layout = enabled;
        self
    }

    pub fn optimize_layout(mut self, enabled: bool) -> Self {
        self.config.optimize_ai_translation_layout = enabled;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }

    pub fn settings(self) -> Arc<StaticSettings> {
        StaticSettings::new(self.config)
    }
}
