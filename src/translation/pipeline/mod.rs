//! 翻译管道模块
//!
//! 提供片段编解码、流式累积和译文对齐

pub mod align;
pub mod codec;
pub mod stream;

// 重新导出主要类型
pub use align::align_by_source_proportion;
pub use codec::{DecodePath, DecodedSegments, FramingMode, SegmentCodec};
pub use stream::{DeltaCallback, StreamAccumulator, StreamingSession};
