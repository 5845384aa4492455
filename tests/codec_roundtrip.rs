//! 片段编解码集成测试
//!
//! 覆盖两种格式的往返、模型输出的常见变形和数量不匹配的处理

use translation_engine::translation::error::TranslationError;
use translation_engine::translation::pipeline::{DecodePath, FramingMode, SegmentCodec};

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 不含分隔符、首尾无空白的片段可以无损往返
#[test]
fn test_delimiter_roundtrip_for_plain_segments() {
    let cases = vec![
        owned(&["Hello"]),
        owned(&["Hello", "World"]),
        owned(&["第一段\n有两行", "second", "третий", "4"]),
    ];

    for segments in cases {
        let encoded = SegmentCodec::encode(&segments, FramingMode::Delimiter).unwrap();
        let decoded = SegmentCodec::decode(&encoded, segments.len(), FramingMode::Delimiter);
        assert_eq!(decoded.segments, segments);
        println!("✅ {} segments round-tripped", segments.len());
    }
}

/// 任意文本（包括 `%%`、引号、换行）在保留排版模式下往返
#[test]
fn test_keep_layout_roundtrip_for_arbitrary_text() {
    let segments = owned(&[
        "100%% sure",
        "she said \"hi\"",
        "  leading and trailing  ",
        "multi\nline\ttext",
        "",
        "emoji 🎉 and \\ backslash",
    ]);

    let encoded = SegmentCodec::encode(&segments, FramingMode::KeepLayout).unwrap();
    assert!(encoded.starts_with("{\n \"line1\""));

    let decoded = SegmentCodec::decode(&encoded, segments.len(), FramingMode::KeepLayout);
    assert_eq!(decoded.path, DecodePath::Json);
    assert_eq!(decoded.segments, segments);
    assert!(!decoded.is_mismatch());
}

#[test]
fn test_delimiter_inside_segment_is_lossy() {
    let segments = owned(&["50%%", "off"]);
    let encoded = SegmentCodec::encode(&segments, FramingMode::Delimiter).unwrap();
    let decoded = SegmentCodec::decode(&encoded, 2, FramingMode::Delimiter);

    assert_eq!(decoded.segments.len(), 3);
    assert_eq!(
        decoded.mismatch_error(),
        Some(TranslationError::DecodeMismatch { expected: 2, actual: 3 })
    );
}

#[test]
fn test_model_answer_with_fence_and_reordered_keys() {
    let raw = "```json\n{\n \"line3\": \"c\",\n \"line1\": \"a\",\n \"line2\": \"b\"\n}\n```\n";
    let decoded = SegmentCodec::decode(raw, 3, FramingMode::KeepLayout);
    assert_eq!(decoded.segments, owned(&["a", "b", "c"]));
}

#[test]
fn test_truncated_layout_answer_keeps_parsed_lines() {
    let raw = "{\n \"line1\": \"Bonjour\",\n \"line2\": \"Mon";
    let decoded = SegmentCodec::decode(raw, 3, FramingMode::KeepLayout);

    assert_eq!(decoded.path, DecodePath::LineScan);
    assert_eq!(decoded.segments, owned(&["Bonjour", "Mon"]));
    assert!(decoded.is_mismatch());
}

#[test]
fn test_fewer_delimited_segments_are_not_padded() {
    let decoded = SegmentCodec::decode("Bonjour Monde", 2, FramingMode::Delimiter);
    assert_eq!(decoded.segments, owned(&["Bonjour Monde"]));
    assert_eq!(decoded.expected, 2);
    assert!(decoded.is_mismatch());
}
