//! DeepL 形式的批量翻译接口适配器
//!
//! 一次请求携带全部片段，结果按位置与原文对应。批量接口没有领域参数。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::language::{deepl_source_language, deepl_target_language};
use super::{count_warning, ensure_success, BackendAdapter, BackendDescriptor};
use crate::translation::config::TranslationApiType;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::DeltaCallback;
use crate::translation::types::{Segment, TranslationOutput, TranslationRequest};

#[derive(Debug, Serialize)]
struct DeepLRequestBody<'a> {
    text: &'a [String],
    /// `null` 表示自动检测
    source_lang: Option<&'static str>,
    target_lang: &'static str,
    preserve_formatting: bool,
    model_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    #[serde(default)]
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    #[serde(default)]
    detected_source_language: Option<String>,
    text: String,
}

fn model_type(prefer_quality: bool) -> &'static str {
    if prefer_quality {
        "prefer_quality_optimized"
    } else {
        "latency_optimized"
    }
}

/// 用户配置的批量翻译接口
pub struct BatchApiAdapter {
    client: reqwest::Client,
}

impl BatchApiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn translate_deepl(
        &self,
        request: &TranslationRequest,
        endpoint: &str,
        api_key: &str,
        prefer_quality: bool,
    ) -> TranslationResult<TranslationOutput> {
        let body = DeepLRequestBody {
            text: &request.segments,
            source_lang: deepl_source_language(&request.source_language),
            target_lang: deepl_target_language(&request.target_language),
            preserve_formatting: true,
            model_type: model_type(prefer_quality),
        };

        tracing::debug!(
            "请求 {} 调用 DeepL: {:?} -> {}, {} 个片段",
            request.request_id,
            body.source_lang,
            body.target_lang,
            request.segments.len()
        );

        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("DeepL-Auth-Key {}", api_key))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, "DeepL").await?;
        let data: DeepLResponse = response.json().await?;

        if let Some(detected) = data
            .translations
            .first()
            .and_then(|t| t.detected_source_language.as_deref())
        {
            tracing::debug!("DeepL 检测到源语言: {}", detected);
        }

        let segments: Vec<Segment> = data
            .translations
            .into_iter()
            .map(|t| Segment::new(t.text))
            .collect();

        let mut output = TranslationOutput::new(request.request_id, segments);
        output.warning = count_warning(request.segments.len(), output.segments.len());
        Ok(output)
    }
}

#[async_trait]
impl BackendAdapter for BatchApiAdapter {
    fn name(&self) -> &'static str {
        "batch"
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
        _on_delta: DeltaCallback,
    ) -> TranslationResult<TranslationOutput> {
        match &request.backend {
            BackendDescriptor::CustomBatchApi {
                provider_kind: TranslationApiType::DeepL,
                endpoint,
                api_key,
                prefer_quality,
            } => {
                self.translate_deepl(request, endpoint, api_key, *prefer_quality)
                    .await
            }
            other => Err(TranslationError::InternalError(format!(
                "批量接口收到了不支持的后端: {}",
                other.type_key()
            ))),
        }
    }
}
