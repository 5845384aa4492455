//! OpenAI 兼容的流式对话模型适配器
//!
//! 官方模型走 `{service}/api/v1/chat/completions`，不带密钥；自定义模型走用户配置的
//! 接口并使用 Bearer 密钥。片段先由 [`SegmentCodec`] 编码，响应按 SSE 逐行解析，
//! 每个 token 推入 [`StreamingSession`]，流结束后用同一种格式解码。

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{ensure_success, service_endpoint, BackendAdapter, BackendDescriptor};
use crate::translation::config::{constants, EngineConfig, SettingsProvider};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::{
    DeltaCallback, FramingMode, SegmentCodec, StreamAccumulator, StreamingSession,
};
use crate::translation::types::{
    Segment, TranslationDomain, TranslationOutput, TranslationRequest,
};

/// 用语言和领域填充提示词模板
pub fn render_system_prompt(
    template: &str,
    source_language: &str,
    target_language: &str,
    domain: TranslationDomain,
    keep_layout: bool,
) -> String {
    let mut prompt = template
        .replace(constants::SOURCE_LANGUAGE_PLACEHOLDER, source_language)
        .replace(constants::TARGET_LANGUAGE_PLACEHOLDER, target_language)
        .replace(constants::TRANSLATION_DOMAIN_PLACEHOLDER, domain.as_str());

    if keep_layout {
        prompt.push_str(constants::KEEP_LAYOUT_PROMPT_SUFFIX);
    }
    prompt
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkContent>,
    /// 服务端忽略 stream 参数时返回完整消息
    #[serde(default)]
    message: Option<ChunkContent>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkContent {
    #[serde(default)]
    content: Option<String>,
}

impl ChatChunk {
    fn text(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .delta
            .as_ref()
            .or(choice.message.as_ref())
            .and_then(|c| c.content.as_deref())
    }
}

/// SSE 事件中的一行
#[derive(Debug, PartialEq)]
enum SseLine {
    Data(String),
    Done,
    Ignored,
}

/// 按行切分 SSE 字节流，跨 chunk 的行和多字节字符都会留到下一次
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn feed(&mut self, bytes: &[u8]) -> Vec<SseLine> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(parse_sse_line(&String::from_utf8_lossy(&raw)));
        }
        lines
    }

    fn flush(&mut self) -> Option<SseLine> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(parse_sse_line(&String::from_utf8_lossy(&raw)))
    }
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.strip_prefix("data:") {
        Some(data) => {
            let data = data.trim_start();
            if data == "[DONE]" {
                SseLine::Done
            } else if data.is_empty() {
                SseLine::Ignored
            } else {
                SseLine::Data(data.to_string())
            }
        }
        None => SseLine::Ignored,
    }
}

/// 处理一个 `data:` 负载
fn apply_chunk(data: &str, session: &mut StreamingSession) -> TranslationResult<()> {
    let chunk: ChatChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!("跳过无法解析的 SSE 数据: {}", e);
            return Ok(());
        }
    };

    if let Some(error) = chunk.error {
        return Err(TranslationError::TransportError(format!("对话接口返回错误: {}", error)));
    }

    if let Some(text) = chunk.text() {
        session.push(text);
    }
    Ok(())
}

/// 一次请求实际使用的接口参数
struct ChatTarget {
    url: String,
    api_key: Option<String>,
    model: String,
}

/// 对话模型适配器
pub struct ChatModelAdapter {
    client: reqwest::Client,
    settings: Arc<dyn SettingsProvider>,
}

impl ChatModelAdapter {
    pub fn new(client: reqwest::Client, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { client, settings }
    }

    fn resolve_target(
        &self,
        config: &EngineConfig,
        backend: &BackendDescriptor,
    ) -> TranslationResult<ChatTarget> {
        match backend {
            BackendDescriptor::OfficialChatModel { model_id, .. } => {
                let base = service_endpoint(&config.service_url, constants::OFFICIAL_CHAT_BASE_PATH)?;
                Ok(ChatTarget {
                    url: completions_url(base.as_str()),
                    api_key: None,
                    model: model_id.clone(),
                })
            }
            BackendDescriptor::CustomChatModel {
                endpoint,
                api_key,
                model_id,
                ..
            } => Ok(ChatTarget {
                url: completions_url(endpoint),
                api_key: (!api_key.is_empty()).then(|| api_key.clone()),
                model: model_id
                    .strip_prefix(constants::CUSTOM_MODEL_PREFIX)
                    .unwrap_or(model_id)
                    .to_string(),
            }),
            other => Err(TranslationError::InternalError(format!(
                "对话接口收到了不支持的后端: {}",
                other.type_key()
            ))),
        }
    }

    async fn read_stream(
        response: reqwest::Response,
        session: &mut StreamingSession,
    ) -> TranslationResult<()> {
        let is_plain_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_plain_json {
            let body = response.text().await?;
            return apply_chunk(&body, session);
        }

        let mut lines = SseLineBuffer::default();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            for line in lines.feed(&bytes) {
                match line {
                    SseLine::Data(data) => apply_chunk(&data, session)?,
                    SseLine::Done => return Ok(()),
                    SseLine::Ignored => {}
                }
            }
        }

        if let Some(SseLine::Data(data)) = lines.flush() {
            apply_chunk(&data, session)?;
        }
        Ok(())
    }
}

/// `{base}/chat/completions`，已经是完整地址时原样使用
fn completions_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl BackendAdapter for ChatModelAdapter {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
        on_delta: DeltaCallback,
    ) -> TranslationResult<TranslationOutput> {
        let config = self.settings.current();
        let target = self.resolve_target(&config, &request.backend)?;
        let mode = FramingMode::from_keep_layout(request.keep_layout);

        let system_prompt = render_system_prompt(
            &config.translation_system_prompt,
            &request.source_language,
            &request.target_language,
            request.domain,
            request.keep_layout,
        );
        let user_content = SegmentCodec::encode(&request.segments, mode)?;

        let body = ChatCompletionBody {
            model: &target.model,
            messages: vec![
                ChatMessage { role: "system", content: &system_prompt },
                ChatMessage { role: "user", content: &user_content },
            ],
            max_completion_tokens: config.max_tokens,
            temperature: config.temperature,
            stream: true,
        };

        tracing::debug!(
            "请求 {} 调用对话模型 {} ({:?})",
            request.request_id,
            target.model,
            mode
        );

        let mut builder = self.client.post(&target.url).json(&body);
        if let Some(key) = target.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let response = ensure_success(response, "对话接口").await?;

        let mut session = StreamAccumulator::start(on_delta);
        let mut warning = None;
        if let Err(e) = Self::read_stream(response, &mut session).await {
            // 已经收到内容时保留部分结果
            if session.token_count() == 0 {
                return Err(e);
            }
            tracing::warn!("流式响应中断，保留已收到的 {} 个 token: {}", session.token_count(), e);
            warning = Some(e);
        }

        let raw = session.finish();
        let decoded = SegmentCodec::decode(&raw, request.segments.len(), mode);
        let warning = warning.or_else(|| decoded.mismatch_error());

        let segments = decoded.segments.into_iter().map(Segment::new).collect();
        let mut output = TranslationOutput::new(request.request_id, segments);
        output.warning = warning;
        Ok(output)
    }
}
