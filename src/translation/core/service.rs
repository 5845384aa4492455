//! 翻译引擎门面
//!
//! `TranslationService` 组合调度器、目录和配置，对外提供：
//!
//! - 源文本入口 `set_source_content`，处理防抖、空内容和重复内容
//! - 可等待的 `request_translate` 和后台的 `submit`，供 OCR 等多片段来源使用
//! - 语言、领域和后端的选择，修改后自动重新翻译当前内容
//! - 通过广播通道推送的 [`EngineEvent`] 和可随时读取的 [`EngineState`]
//!
//! 引擎只维护内存中的状态，不负责渲染和持久化。

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;

use super::scheduler::{DispatchObserver, DispatchOutcome, RequestScheduler, SchedulerStatsSnapshot};
use crate::translation::backends::AdapterSet;
use crate::translation::config::{EngineConfig, SettingsProvider, StaticSettings};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::storage::{
    BackendCatalogResolver, BackendGroup, BackendOption, CatalogCache, HttpCatalogSource,
};
use crate::translation::types::{RequestOverrides, Segment, Selection, TranslationDomain};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 引擎事件
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// 加载状态变化
    Loading {
        start_loading: bool,
        delta_loading: bool,
    },
    /// 流式增量，`buffer` 为当前请求已累积的文本
    Delta {
        request_id: u64,
        delta: String,
        buffer: String,
    },
    /// 最新请求完成
    Completed {
        request_id: u64,
        segments: Vec<Segment>,
        translated_content: String,
    },
    /// 最新请求失败
    Failed {
        request_id: u64,
        error: TranslationError,
        /// 需要提示用户时为 `Some`
        user_message: Option<String>,
    },
    /// 结果照常应用，但有需要记录的问题
    Warning {
        request_id: u64,
        warning: TranslationError,
    },
    SelectionChanged(Selection),
}

/// 引擎的可见状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub source_content: String,
    pub translated_content: String,
    pub segments: Vec<Segment>,
    /// 当前请求已发出，尚未完成
    pub start_loading: bool,
    /// 当前请求正在接收流式输出
    pub delta_loading: bool,
    pub current_request_id: u64,
    pub last_applied_request_id: u64,
    pub last_error: Option<TranslationError>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 调度器回调写入的共享状态
struct EngineShared {
    state: RwLock<EngineState>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineShared {
    fn emit(&self, event: EngineEvent) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.events.send(event);
    }

    fn emit_loading(&self, state: &EngineState) {
        self.emit(EngineEvent::Loading {
            start_loading: state.start_loading,
            delta_loading: state.delta_loading,
        });
    }
}

impl DispatchObserver for EngineShared {
    fn on_started(&self, request_id: u64) {
        let mut state = write(&self.state);
        if request_id < state.current_request_id {
            return;
        }
        state.current_request_id = request_id;
        state.start_loading = true;
        state.delta_loading = false;
        self.emit_loading(&state);
    }

    fn on_delta(&self, request_id: u64, delta: &str) {
        let mut state = write(&self.state);
        if state.current_request_id != request_id {
            return;
        }

        if !state.delta_loading {
            state.delta_loading = true;
            state.translated_content.clear();
            self.emit_loading(&state);
        }

        state.translated_content.push_str(delta);
        self.emit(EngineEvent::Delta {
            request_id,
            delta: delta.to_string(),
            buffer: state.translated_content.clone(),
        });
    }

    fn on_finished(&self, outcome: &DispatchOutcome) {
        // 更新的请求已分配编号，加载状态由它负责结束
        if matches!(outcome, DispatchOutcome::Superseded { .. }) {
            return;
        }

        let mut state = write(&self.state);
        let request_id = outcome.request_id();
        if state.current_request_id != request_id {
            tracing::debug!("请求 {} 不是当前请求，不更新状态", request_id);
            return;
        }

        match outcome {
            DispatchOutcome::Completed(output) => {
                state.segments = output.segments.clone();
                state.translated_content = output.joined();
                state.last_applied_request_id = request_id;
                state.last_error = None;

                if let Some(warning) = &output.warning {
                    tracing::warn!("请求 {} 完成但有警告: {}", request_id, warning);
                    self.emit(EngineEvent::Warning {
                        request_id,
                        warning: warning.clone(),
                    });
                }

                self.emit(EngineEvent::Completed {
                    request_id,
                    segments: state.segments.clone(),
                    translated_content: state.translated_content.clone(),
                });
            }
            DispatchOutcome::Failed { error, .. } => {
                state.last_error = Some(error.clone());
                self.emit(EngineEvent::Failed {
                    request_id,
                    error: error.clone(),
                    user_message: error.is_user_visible().then(|| error.user_message()),
                });
            }
            DispatchOutcome::Superseded { .. } => return,
        }

        state.start_loading = false;
        state.delta_loading = false;
        self.emit_loading(&state);
    }
}

/// 翻译引擎
pub struct TranslationService {
    settings: Arc<dyn SettingsProvider>,
    scheduler: RequestScheduler,
    shared: Arc<EngineShared>,
    selection: RwLock<Selection>,
}

impl TranslationService {
    /// 使用 HTTP 后端和官方目录创建引擎
    pub fn new(settings: Arc<dyn SettingsProvider>) -> TranslationResult<Self> {
        let config = settings.current();
        config.validate()?;

        let client = crate::translation::backends::build_http_client(config.request_timeout())?;
        let source = Arc::new(HttpCatalogSource::new(client, settings.clone()));
        let adapters = AdapterSet::http(settings.clone())?;

        Ok(Self::with_components(settings, CatalogCache::new(source), adapters))
    }

    /// 从固定配置创建
    pub fn from_config(config: EngineConfig) -> TranslationResult<Self> {
        Self::new(StaticSettings::new(config))
    }

    /// 注入目录缓存和适配器
    ///
    /// 多个引擎实例可以共享同一个目录缓存。
    pub fn with_components(
        settings: Arc<dyn SettingsProvider>,
        catalog: Arc<CatalogCache>,
        adapters: AdapterSet,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(EngineShared {
            state: RwLock::new(EngineState::default()),
            events,
        });

        let scheduler = RequestScheduler::new(
            BackendCatalogResolver::new(catalog),
            adapters,
            settings.clone(),
            shared.clone(),
        );
        let selection = settings.current().selection;

        tracing::info!(
            "翻译引擎已创建: {} -> {}, 后端 {}",
            selection.source_language,
            selection.target_language,
            selection.translation_type
        );

        Self {
            settings,
            scheduler,
            shared,
            selection: RwLock::new(selection),
        }
    }

    /// 订阅引擎事件
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> EngineState {
        read(&self.shared.state).clone()
    }

    pub fn translated_content(&self) -> String {
        read(&self.shared.state).translated_content.clone()
    }

    pub fn selection(&self) -> Selection {
        read(&self.selection).clone()
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> SchedulerStatsSnapshot {
        self.scheduler.stats().snapshot()
    }

    /// 预先加载官方目录
    pub async fn ensure_catalogs_loaded(&self) {
        self.scheduler.resolver().ensure_catalogs_loaded().await;
    }

    /// 更新源文本
    ///
    /// 空内容和未变化的内容不会触发翻译。返回是否安排了一次翻译。
    pub fn set_source_content(&self, content: &str, ignore_debounce: bool) -> bool {
        {
            let mut state = write(&self.shared.state);
            if state.source_content == content {
                tracing::trace!("源文本未变化，跳过翻译");
                return false;
            }
            state.source_content = content.to_string();
        }

        if content.trim().is_empty() {
            return false;
        }

        let keep_layout = self.settings.current().keep_layout;
        let segments = vec![content.to_string()];
        if ignore_debounce {
            self.scheduler
                .trigger_immediate(segments, self.selection(), keep_layout);
        } else {
            self.scheduler
                .trigger_debounced(segments, self.selection(), keep_layout);
        }
        true
    }

    /// 翻译一组片段并等待结果
    pub async fn request_translate(
        &self,
        segments: Vec<String>,
        overrides: RequestOverrides,
    ) -> TranslationResult<DispatchOutcome> {
        let (selection, keep_layout) = self.effective(&overrides);
        self.scheduler.dispatch(segments, selection, keep_layout).await
    }

    /// 后台翻译一组片段，结果通过事件和状态获取
    pub fn submit(&self, segments: Vec<String>, overrides: RequestOverrides) -> TranslationResult<u64> {
        let (selection, keep_layout) = self.effective(&overrides);
        self.scheduler.submit(segments, selection, keep_layout)
    }

    fn effective(&self, overrides: &RequestOverrides) -> (Selection, bool) {
        let selection = self.selection().with_overrides(overrides);
        let keep_layout = overrides
            .keep_layout
            .unwrap_or_else(|| self.settings.current().keep_layout);
        (selection, keep_layout)
    }

    pub fn update_source_language(&self, language: &str) {
        self.update_selection(|s| s.source_language = language.to_string());
    }

    pub fn update_target_language(&self, language: &str) {
        self.update_selection(|s| s.target_language = language.to_string());
    }

    pub fn update_domain(&self, domain: TranslationDomain) {
        self.update_selection(|s| s.domain = domain);
    }

    pub fn update_translation_type(&self, type_key: &str) {
        self.update_selection(|s| s.translation_type = type_key.to_string());
    }

    /// 源语言为自动检测或与目标语言相同时不能互换
    pub fn can_swap_languages(&self) -> bool {
        let selection = read(&self.selection);
        selection.source_language != "auto"
            && selection.source_language != selection.target_language
    }

    /// 互换源语言和目标语言，返回是否发生了互换
    pub fn swap_languages(&self) -> bool {
        if !self.can_swap_languages() {
            return false;
        }
        self.update_selection(|s| std::mem::swap(&mut s.source_language, &mut s.target_language));
        true
    }

    /// 当前选择的后端是否支持领域参数，后端未知时视为支持
    pub fn supports_domain(&self) -> bool {
        let config = self.settings.current();
        let type_key = read(&self.selection).translation_type.clone();
        self.scheduler
            .resolver()
            .find(&config, &type_key)
            .map_or(true, |backend| backend.supports_domain())
    }

    /// 按分组列出可选后端
    pub fn backend_options(&self) -> Vec<(BackendGroup, Vec<BackendOption>)> {
        self.scheduler
            .resolver()
            .backend_options(&self.settings.current())
    }

    /// 修改选择，有变化时广播并重新翻译当前源文本
    fn update_selection(&self, f: impl FnOnce(&mut Selection)) {
        let updated = {
            let mut selection = write(&self.selection);
            let before = selection.clone();
            f(&mut selection);
            if *selection == before {
                return;
            }
            selection.clone()
        };

        tracing::debug!("选择已更新: {:?}", updated);
        self.shared.emit(EngineEvent::SelectionChanged(updated.clone()));

        let source = read(&self.shared.state).source_content.clone();
        if !source.trim().is_empty() {
            let keep_layout = self.settings.current().keep_layout;
            self.scheduler
                .trigger_debounced(vec![source], updated, keep_layout);
        }
    }
}
