//! 官方旧版翻译接口适配器

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{count_warning, ensure_success, service_endpoint, BackendAdapter, BackendDescriptor};
use crate::translation::config::{constants, SettingsProvider};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::DeltaCallback;
use crate::translation::types::{
    Segment, TranslationDomain, TranslationOutput, TranslationRequest,
};

#[derive(Debug, Serialize)]
struct LegacyTranslateBody<'a> {
    content: &'a [String],
    from: &'a str,
    to: &'a str,
    domain: TranslationDomain,
    #[serde(rename = "type")]
    translation_type: i64,
}

#[derive(Debug, Deserialize)]
struct LegacyTranslateResponse {
    #[serde(default)]
    results: Vec<LegacyTranslateItem>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyTranslateItem {
    content: String,
}

/// 官方旧版翻译接口
pub struct LegacyAdapter {
    client: reqwest::Client,
    settings: Arc<dyn SettingsProvider>,
}

impl LegacyAdapter {
    pub fn new(client: reqwest::Client, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { client, settings }
    }
}

#[async_trait]
impl BackendAdapter for LegacyAdapter {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
        _on_delta: DeltaCallback,
    ) -> TranslationResult<TranslationOutput> {
        let translation_type = match &request.backend {
            BackendDescriptor::OfficialLegacy { id, .. } => *id,
            other => {
                return Err(TranslationError::InternalError(format!(
                    "旧版接口收到了不支持的后端: {}",
                    other.type_key()
                )))
            }
        };

        let url = service_endpoint(&self.settings.current().service_url, constants::TRANSLATE_PATH)?;
        let body = LegacyTranslateBody {
            content: &request.segments,
            from: &request.source_language,
            to: &request.target_language,
            domain: request.domain,
            translation_type,
        };

        tracing::debug!(
            "请求 {} 调用旧版翻译接口: type={}, {} 个片段",
            request.request_id,
            translation_type,
            request.segments.len()
        );

        let response = self.client.post(url).json(&body).send().await?;
        let response = ensure_success(response, "旧版翻译接口").await?;
        let data: LegacyTranslateResponse = response.json().await?;

        if let (Some(from), Some(to)) = (&data.from, &data.to) {
            tracing::debug!("旧版翻译接口识别语言: {} -> {}", from, to);
        }

        let segments: Vec<Segment> = data
            .results
            .into_iter()
            .map(|item| Segment::new(item.content))
            .collect();

        let mut output = TranslationOutput::new(request.request_id, segments);
        output.warning = count_warning(request.segments.len(), output.segments.len());
        Ok(output)
    }
}
