//! 片段编解码
//!
//! 把 N 个逻辑片段编码成对话模型能理解的文本，并从模型输出中解码回来。
//! 编解码是纯函数，不持有任何状态。
//!
//! ## 两种格式
//!
//! - **分隔符模式**: 片段之间用单独一行的 `%%` 分隔。如果片段本身包含 `%%`，
//!   解码会多切出片段，这是已知的取舍。
//! - **保留排版模式**: 编码为 `{"line1": ..., "line2": ...}` 的 JSON 对象，
//!   一个空格缩进。解码优先按 JSON 解析，失败时逐行扫描 `"lineK": "..."`。
//!
//! 解码不会截断或补齐结果，数量不一致时由调用方记录警告。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::translation::config::constants::{KEEP_LAYOUT_KEY_PREFIX, SEGMENT_DELIMITER};
use crate::translation::error::{TranslationError, TranslationResult};

/// 片段编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FramingMode {
    #[default]
    Delimiter,
    KeepLayout,
}

impl FramingMode {
    pub fn from_keep_layout(keep_layout: bool) -> Self {
        if keep_layout {
            FramingMode::KeepLayout
        } else {
            FramingMode::Delimiter
        }
    }
}

/// 解码结果实际走的路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    Delimiter,
    Json,
    LineScan,
}

/// 解码结果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSegments {
    pub segments: Vec<String>,
    pub expected: usize,
    pub path: DecodePath,
}

impl DecodedSegments {
    pub fn is_mismatch(&self) -> bool {
        self.segments.len() != self.expected
    }

    pub fn mismatch_error(&self) -> Option<TranslationError> {
        self.is_mismatch().then(|| TranslationError::DecodeMismatch {
            expected: self.expected,
            actual: self.segments.len(),
        })
    }
}

/// 片段编解码器
pub struct SegmentCodec;

impl SegmentCodec {
    /// 编码片段
    pub fn encode<S: AsRef<str>>(segments: &[S], mode: FramingMode) -> TranslationResult<String> {
        match mode {
            FramingMode::Delimiter => Ok(Self::encode_delimited(segments)),
            FramingMode::KeepLayout => Self::encode_layout(segments),
        }
    }

    /// 解码模型输出
    pub fn decode(raw: &str, expected_count: usize, mode: FramingMode) -> DecodedSegments {
        let decoded = match mode {
            FramingMode::Delimiter => DecodedSegments {
                segments: Self::decode_delimited(raw, expected_count),
                expected: expected_count,
                path: DecodePath::Delimiter,
            },
            FramingMode::KeepLayout => Self::decode_layout(raw, expected_count),
        };

        if decoded.is_mismatch() {
            tracing::warn!(
                "解码片段数量不匹配: 期望 {}，得到 {} ({:?})",
                decoded.expected,
                decoded.segments.len(),
                decoded.path
            );
        }

        decoded
    }

    fn encode_delimited<S: AsRef<str>>(segments: &[S]) -> String {
        let separator = format!("\n{}\n", SEGMENT_DELIMITER);
        segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(&separator)
    }

    fn decode_delimited(raw: &str, expected_count: usize) -> Vec<String> {
        // 单个片段不切分，避免译文里恰好出现 %% 时被拆开
        if expected_count <= 1 {
            return vec![raw.trim().to_string()];
        }

        raw.split(SEGMENT_DELIMITER)
            .map(|part| part.trim().to_string())
            .collect()
    }

    fn encode_layout<S: AsRef<str>>(segments: &[S]) -> TranslationResult<String> {
        let mut lines = Map::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            lines.insert(
                format!("{}{}", KEEP_LAYOUT_KEY_PREFIX, index + 1),
                Value::String(segment.as_ref().to_string()),
            );
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        Value::Object(lines).serialize(&mut serializer)?;

        String::from_utf8(buf)
            .map_err(|e| TranslationError::InternalError(format!("JSON输出不是UTF-8: {}", e)))
    }

    fn decode_layout(raw: &str, expected_count: usize) -> DecodedSegments {
        let body = strip_code_fence(raw);

        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if let Some(segments) = segments_from_json(value) {
                return DecodedSegments {
                    segments,
                    expected: expected_count,
                    path: DecodePath::Json,
                };
            }
        }

        tracing::debug!("保留排版输出不是合法JSON，改为逐行解析");
        let scanned = scan_layout_lines(body);
        if !scanned.is_empty() {
            return DecodedSegments {
                segments: scanned,
                expected: expected_count,
                path: DecodePath::LineScan,
            };
        }

        // 模型完全忽略了 JSON 格式，只能按普通文本处理
        DecodedSegments {
            segments: Self::decode_delimited(raw, expected_count),
            expected: expected_count,
            path: DecodePath::Delimiter,
        }
    }
}

/// 去掉 ```json ... ``` 包裹
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let without_open = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => return trimmed,
    };

    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// 从 `lineK` 键中取出 K
fn line_index(key: &str) -> Option<usize> {
    key.strip_prefix(KEEP_LAYOUT_KEY_PREFIX)?.parse().ok()
}

fn segments_from_json(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(Option<usize>, usize, String)> = map
                .into_iter()
                .enumerate()
                .map(|(position, (key, value))| (line_index(&key), position, value_to_text(value)))
                .collect();

            // 带编号的键按编号排序，其余保持原顺序排在后面
            entries.sort_by_key(|(index, position, _)| (index.unwrap_or(usize::MAX), *position));
            Some(entries.into_iter().map(|(_, _, text)| text).collect())
        }
        Value::Array(items) => Some(items.into_iter().map(value_to_text).collect()),
        _ => None,
    }
}

fn layout_line_regex() -> &'static Regex {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    LINE_RE.get_or_init(|| {
        Regex::new(r#""line(\d+)"\s*:\s*"((?:[^"\\]|\\.)*)"?"#).expect("layout line regex is valid")
    })
}

/// 逐行扫描 `"lineK": "..."`，容忍截断、多余逗号和任意位数的编号
fn scan_layout_lines(body: &str) -> Vec<String> {
    let mut found = BTreeMap::new();

    for line in body.lines() {
        if let Some(captures) = layout_line_regex().captures(line) {
            let index = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok());
            let text = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
            if let Some(index) = index {
                found.entry(index).or_insert_with(|| unescape_json_fragment(text));
            }
        }
    }

    found.into_values().collect()
}

fn unescape_json_fragment(fragment: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", fragment))
        .unwrap_or_else(|_| fragment.to_string())
}
