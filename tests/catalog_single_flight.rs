//! 官方目录加载测试
//!
//! 并发调用只拉取一次，失败的目录记为空且不重试

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use std::time::Duration;

use common::*;
use translation_engine::translation::storage::{BackendCatalogResolver, BackendGroup, CatalogCache};

#[tokio::test]
async fn test_concurrent_ensure_fetches_once() {
    let source = CountingCatalogSource::with(Duration::from_millis(20), false, false);
    let cache = CatalogCache::new(source.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.ensure_catalogs_loaded().await }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(source.type_fetches(), 1);
    assert_eq!(source.model_fetches(), 1);
    assert!(cache.is_loaded());
    assert!(!cache.is_loading());
    assert_eq!(cache.official_legacy_types().len(), 5);
    assert_eq!(cache.official_chat_models().len(), 1);
    println!("✅ 8 个并发调用只拉取一次目录");
}

#[tokio::test]
async fn test_loaded_catalog_is_not_refetched() {
    let source = CountingCatalogSource::new();
    let cache = CatalogCache::new(source.clone());

    cache.ensure_catalogs_loaded().await;
    cache.ensure_catalogs_loaded().await;
    cache.ensure_catalogs_loaded().await;

    assert_eq!(source.type_fetches(), 1);
    assert_eq!(source.model_fetches(), 1);
}

#[tokio::test]
async fn test_failed_catalog_is_empty_and_not_retried() {
    let source = CountingCatalogSource::with(Duration::ZERO, false, true);
    let cache = CatalogCache::new(source.clone());

    cache.ensure_catalogs_loaded().await;
    assert!(cache.is_loaded());
    assert_eq!(cache.official_legacy_types().len(), 5);
    assert!(cache.official_chat_models().is_empty());

    cache.ensure_catalogs_loaded().await;
    assert_eq!(source.model_fetches(), 1);
}

#[tokio::test]
async fn test_both_catalogs_failing_leaves_only_custom_backends() {
    let source = CountingCatalogSource::with(Duration::ZERO, true, true);
    let resolver = BackendCatalogResolver::new(CatalogCache::new(source));
    resolver.ensure_catalogs_loaded().await;

    let config = TestConfigBuilder::new()
        .custom_chat("https://api.example.com/v1", "gpt-4o-mini", "Mine")
        .build();
    let groups = resolver.backend_options(&config);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, BackendGroup::Custom);
    assert_eq!(groups[0].1[0].type_key, "custom_model/gpt-4o-mini");
    assert!(resolver.find(&config, "0").is_none());
}

#[tokio::test]
async fn test_unloaded_catalog_resolves_custom_only() {
    let source = CountingCatalogSource::new();
    let resolver = BackendCatalogResolver::new(CatalogCache::new(source.clone()));

    let config = TestConfigBuilder::new()
        .deepl("https://api-free.deepl.com/v2/translate", false)
        .build();
    let keys: Vec<String> = resolver.resolve(&config).iter().map(|d| d.type_key()).collect();

    assert_eq!(keys, vec!["translation_api_deepl".to_string()]);
    assert_eq!(source.type_fetches(), 0);
}

#[tokio::test]
async fn test_official_chat_models_follow_legacy_types() {
    let resolver = BackendCatalogResolver::new(loaded_catalog().await);
    let keys: Vec<String> = resolver
        .resolve(&TestConfigBuilder::new().build())
        .iter()
        .map(|d| d.type_key())
        .collect();

    assert_eq!(keys, vec!["0", "1", "2", "3", "4", "deepseek-chat"]);
    let chat = resolver
        .find(&TestConfigBuilder::new().build(), "deepseek-chat")
        .unwrap();
    assert!(chat.is_official());
    assert!(chat.is_chat_model());
    assert_eq!(chat.display_name(), "DeepSeek V3");
}
