//! 存储模块
//!
//! 提供官方后端目录的缓存与合并。

pub mod catalog;

pub use catalog::{
    BackendCatalogResolver, BackendGroup, BackendOption, CatalogCache, CatalogSource,
    ChatModelOption, HttpCatalogSource, TranslationTypeOption,
};
