//! 请求调度
//!
//! 每次调度分配一个严格递增的请求编号。请求完成时如果编号已经不是最新的，
//! 结果直接丢弃（最后一次请求获胜）。网络请求本身不会被取消。
//!
//! 防抖触发在静默期内合并连续调用，只有最后一次的参数会被调度；
//! 立即触发跳过防抖，只等待一个很短的稳定期。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::translation::backends::AdapterSet;
use crate::translation::config::SettingsProvider;
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::pipeline::align_by_source_proportion;
use crate::translation::storage::BackendCatalogResolver;
use crate::translation::types::{Segment, Selection, TranslationOutput, TranslationRequest};

/// 一次调度的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 最新请求成功
    Completed(TranslationOutput),
    /// 最新请求失败
    Failed { request_id: u64, error: TranslationError },
    /// 已被更新的请求取代，结果被丢弃
    Superseded { request_id: u64 },
}

impl DispatchOutcome {
    pub fn request_id(&self) -> u64 {
        match self {
            DispatchOutcome::Completed(output) => output.request_id,
            DispatchOutcome::Failed { request_id, .. } => *request_id,
            DispatchOutcome::Superseded { request_id } => *request_id,
        }
    }
}

/// 调度过程的观察者
///
/// 增量回调只会在请求仍是最新时触发。
pub trait DispatchObserver: Send + Sync {
    fn on_started(&self, request_id: u64);
    fn on_delta(&self, request_id: u64, delta: &str);
    fn on_finished(&self, outcome: &DispatchOutcome);
}

/// 什么都不做的观察者
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {
    fn on_started(&self, _request_id: u64) {}
    fn on_delta(&self, _request_id: u64, _delta: &str) {}
    fn on_finished(&self, _outcome: &DispatchOutcome) {}
}

/// 调度统计
#[derive(Debug, Default)]
pub struct SchedulerStats {
    pub dispatched: AtomicUsize,
    pub completed: AtomicUsize,
    pub failed: AtomicUsize,
    pub superseded: AtomicUsize,
    pub debounce_coalesced: AtomicUsize,
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStatsSnapshot {
    pub dispatched: usize,
    pub completed: usize,
    pub failed: usize,
    pub superseded: usize,
    pub debounce_coalesced: usize,
}

impl SchedulerStats {
    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            debounce_coalesced: self.debounce_coalesced.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.dispatched.store(0, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.superseded.store(0, Ordering::Relaxed);
        self.debounce_coalesced.store(0, Ordering::Relaxed);
    }
}

struct SchedulerInner {
    counter: AtomicU64,
    trigger_generation: AtomicU64,
    resolver: BackendCatalogResolver,
    adapters: AdapterSet,
    settings: Arc<dyn SettingsProvider>,
    observer: Arc<dyn DispatchObserver>,
    stats: SchedulerStats,
}

impl SchedulerInner {
    fn is_current(&self, request_id: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == request_id
    }
}

/// 请求调度器
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<SchedulerInner>,
}

impl RequestScheduler {
    pub fn new(
        resolver: BackendCatalogResolver,
        adapters: AdapterSet,
        settings: Arc<dyn SettingsProvider>,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                counter: AtomicU64::new(0),
                trigger_generation: AtomicU64::new(0),
                resolver,
                adapters,
                settings,
                observer,
                stats: SchedulerStats::default(),
            }),
        }
    }

    /// 最近一次分配的请求编号，尚未调度时为 0
    pub fn latest_request_id(&self) -> u64 {
        self.inner.counter.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, request_id: u64) -> bool {
        self.inner.is_current(request_id)
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.inner.stats
    }

    pub fn resolver(&self) -> &BackendCatalogResolver {
        &self.inner.resolver
    }

    fn next_request_id(&self) -> u64 {
        self.inner.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 调度并等待结果
    pub async fn dispatch(
        &self,
        segments: Vec<String>,
        selection: Selection,
        keep_layout: bool,
    ) -> TranslationResult<DispatchOutcome> {
        validate_segments(&segments)?;
        let request_id = self.next_request_id();
        Ok(self.run(request_id, segments, selection, keep_layout).await)
    }

    /// 后台调度，立即返回请求编号
    pub fn submit(
        &self,
        segments: Vec<String>,
        selection: Selection,
        keep_layout: bool,
    ) -> TranslationResult<u64> {
        validate_segments(&segments)?;
        let request_id = self.next_request_id();

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run(request_id, segments, selection, keep_layout).await;
        });

        Ok(request_id)
    }

    /// 防抖触发
    ///
    /// 静默期内再次触发（无论哪种方式）会让这次调用作废。
    pub fn trigger_debounced(&self, segments: Vec<String>, selection: Selection, keep_layout: bool) {
        let generation = self.inner.trigger_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let quiet_period = self.inner.settings.current().debounce();
        let scheduler = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            if scheduler.inner.trigger_generation.load(Ordering::SeqCst) != generation {
                scheduler
                    .inner
                    .stats
                    .debounce_coalesced
                    .fetch_add(1, Ordering::Relaxed);
                return;
            }

            if let Err(e) = scheduler.submit(segments, selection, keep_layout) {
                helpers::log_error(&e);
            }
        });
    }

    /// 立即触发，等待稳定期后调度，并作废尚未触发的防抖调用
    pub fn trigger_immediate(&self, segments: Vec<String>, selection: Selection, keep_layout: bool) {
        self.inner.trigger_generation.fetch_add(1, Ordering::SeqCst);
        let settle_delay = self.inner.settings.current().settle_delay();
        let scheduler = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(settle_delay).await;
            if let Err(e) = scheduler.submit(segments, selection, keep_layout) {
                helpers::log_error(&e);
            }
        });
    }

    async fn run(
        &self,
        request_id: u64,
        segments: Vec<String>,
        selection: Selection,
        keep_layout: bool,
    ) -> DispatchOutcome {
        let inner = &self.inner;
        inner.stats.dispatched.fetch_add(1, Ordering::Relaxed);
        inner.observer.on_started(request_id);

        let result = self.translate(request_id, segments, selection, keep_layout).await;

        let outcome = if !inner.is_current(request_id) {
            tracing::debug!("请求 {} 已被新请求取代，丢弃结果", request_id);
            inner.stats.superseded.fetch_add(1, Ordering::Relaxed);
            DispatchOutcome::Superseded { request_id }
        } else {
            match result {
                Ok(output) => {
                    inner.stats.completed.fetch_add(1, Ordering::Relaxed);
                    DispatchOutcome::Completed(output)
                }
                Err(error) => {
                    inner.stats.failed.fetch_add(1, Ordering::Relaxed);
                    helpers::log_error(&error);
                    DispatchOutcome::Failed { request_id, error }
                }
            }
        };

        inner.observer.on_finished(&outcome);
        outcome
    }

    async fn translate(
        &self,
        request_id: u64,
        segments: Vec<String>,
        selection: Selection,
        keep_layout: bool,
    ) -> TranslationResult<TranslationOutput> {
        let inner = &self.inner;
        inner.resolver.ensure_catalogs_loaded().await;

        let config = inner.settings.current();
        let backend = inner
            .resolver
            .find(&config, &selection.translation_type)
            .ok_or_else(|| TranslationError::NoMatchingBackend(selection.translation_type.clone()))?;

        let adapter = inner.adapters.adapter_for(&backend).clone();
        tracing::debug!(
            "调度请求 {}: {} ({}), {} 个片段",
            request_id,
            backend.type_key(),
            adapter.name(),
            segments.len()
        );

        let request = TranslationRequest {
            request_id,
            segments,
            source_language: selection.source_language,
            target_language: selection.target_language,
            domain: selection.domain,
            backend,
            keep_layout,
        };

        let delta_inner = Arc::clone(inner);
        let on_delta = Box::new(move |delta: &str| {
            if delta_inner.is_current(request_id) {
                delta_inner.observer.on_delta(request_id, delta);
            }
        });

        let mut output = adapter.translate(&request, on_delta).await?;

        if config.optimize_ai_translation_layout && output.segments.len() < request.segments.len() {
            output.segments = align_by_source_proportion(&request.segments, &output.contents())
                .into_iter()
                .map(Segment::new)
                .collect();
            // 对齐后数量已一致
            if output.segments.len() == request.segments.len()
                && matches!(output.warning, Some(TranslationError::DecodeMismatch { .. }))
            {
                output.warning = None;
            }
        }

        Ok(output)
    }
}

fn validate_segments(segments: &[String]) -> TranslationResult<()> {
    if segments.is_empty() {
        return Err(TranslationError::InvalidInput("至少需要一个片段".to_string()));
    }
    Ok(())
}
