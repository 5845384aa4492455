//! 翻译请求与结果的基础类型

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::translation::backends::BackendDescriptor;
use crate::translation::config::constants;
use crate::translation::error::TranslationError;

/// 翻译领域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationDomain {
    #[default]
    General,
    Computers,
    Medicine,
    Finance,
    Game,
}

impl TranslationDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationDomain::General => "general",
            TranslationDomain::Computers => "computers",
            TranslationDomain::Medicine => "medicine",
            TranslationDomain::Finance => "finance",
            TranslationDomain::Game => "game",
        }
    }

    pub fn all() -> [TranslationDomain; 5] {
        [
            TranslationDomain::General,
            TranslationDomain::Computers,
            TranslationDomain::Medicine,
            TranslationDomain::Finance,
            TranslationDomain::Game,
        ]
    }
}

impl fmt::Display for TranslationDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前的语言、领域和后端选择
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub source_language: String,
    pub target_language: String,
    pub domain: TranslationDomain,
    /// 目录中后端的 `type` 键
    pub translation_type: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            source_language: constants::DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_language: constants::DEFAULT_TARGET_LANGUAGE.to_string(),
            domain: TranslationDomain::General,
            translation_type: constants::DEFAULT_TRANSLATION_TYPE.to_string(),
        }
    }
}

impl Selection {
    /// 用覆盖项替换部分字段
    pub fn with_overrides(&self, overrides: &RequestOverrides) -> Selection {
        Selection {
            source_language: overrides
                .source_language
                .clone()
                .unwrap_or_else(|| self.source_language.clone()),
            target_language: overrides
                .target_language
                .clone()
                .unwrap_or_else(|| self.target_language.clone()),
            domain: overrides.domain.unwrap_or(self.domain),
            translation_type: overrides
                .translation_type
                .clone()
                .unwrap_or_else(|| self.translation_type.clone()),
        }
    }
}

/// 单次提交的可选覆盖项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub domain: Option<TranslationDomain>,
    pub translation_type: Option<String>,
    /// 为 `None` 时沿用配置中的保留排版开关
    pub keep_layout: Option<bool>,
}

/// 翻译后的单个片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub content: String,
}

impl Segment {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// 发往后端适配器的请求
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub request_id: u64,
    pub segments: Vec<String>,
    pub source_language: String,
    pub target_language: String,
    pub domain: TranslationDomain,
    pub backend: BackendDescriptor,
    pub keep_layout: bool,
}

/// 适配器返回的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutput {
    pub request_id: u64,
    pub segments: Vec<Segment>,
    /// 例如片段数量不匹配，结果照常返回
    pub warning: Option<TranslationError>,
}

impl TranslationOutput {
    pub fn new(request_id: u64, segments: Vec<Segment>) -> Self {
        Self {
            request_id,
            segments,
            warning: None,
        }
    }

    pub fn contents(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.content.clone()).collect()
    }

    /// 拼接后的整段文本，用于展示
    pub fn joined(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
