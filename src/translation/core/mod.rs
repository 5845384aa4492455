//! 翻译系统核心模块
//!
//! - **调度层** (`scheduler.rs`): 分配请求编号，防抖与立即触发，丢弃过期结果
//! - **服务层** (`service.rs`): 对外的引擎门面，维护选择和可见状态
//!
//! ```text
//! TranslationService (service.rs)
//!     └── RequestScheduler (scheduler.rs)
//!             ├── BackendCatalogResolver (storage/catalog.rs)
//!             └── AdapterSet (backends/)
//!                     └── SegmentCodec / StreamAccumulator (pipeline/)
//! ```

pub mod scheduler;
pub mod service;

pub use scheduler::{
    DispatchObserver, DispatchOutcome, NoopObserver, RequestScheduler, SchedulerStats,
    SchedulerStatsSnapshot,
};
pub use service::{EngineEvent, EngineState, TranslationService};
