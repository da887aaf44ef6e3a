//! Tests for response cache integration.

mod test_utils;

use async_trait::async_trait;
use lectern_cache::{CacheStats, MemoryCache, ResponseCache};
use lectern_client::{ApiClient, ClientConfig, Credential};
use lectern_error::{LecternResult, StorageError, StorageErrorKind};
use lectern_rate_limit::CallContext;
use serde_json::Value;
use std::sync::Arc;
use test_utils::*;

fn cached_client(
    config: ClientConfig,
    transport: Arc<ScriptedTransport>,
    cache: Arc<dyn ResponseCache>,
) -> ApiClient {
    ApiClient::builder(config)
        .with_credential(Credential::fixed(TOKEN))
        .with_transport(transport)
        .with_cache(cache)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_single_resource_hit_skips_network() {
    let transport = ScriptedTransport::new([json(200, r#"{"id":1}"#)]);
    let cache = Arc::new(MemoryCache::default());
    let client = cached_client(config(), transport.clone(), cache.clone());
    let ctx = CallContext::new();

    let first: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();
    let second: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.call_count(), 1);
    let stats = client.cache_stats().await.unwrap().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_masquerade_target_separates_entries() {
    let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::default());
    let ctx = CallContext::new();

    let plain_transport = ScriptedTransport::new([json(200, r#"{"who":"self"}"#)]);
    let plain = cached_client(config(), plain_transport, cache.clone());
    let _: Value = plain.get_json(&ctx, "/api/v1/users/self").await.unwrap();

    let masq_transport = ScriptedTransport::new([json(200, r#"{"who":"42"}"#)]);
    let masq = cached_client(
        config().with_as_user_id(Some("42".to_string())),
        masq_transport.clone(),
        cache.clone(),
    );
    let who: Value = masq.get_json(&ctx, "/api/v1/users/self").await.unwrap();

    assert_eq!(who["who"], "42");
    assert_eq!(masq_transport.call_count(), 1);
}

#[tokio::test]
async fn test_uncapped_pagination_is_cached() {
    let transport = ScriptedTransport::new([
        page("[1]", Some("/api/v1/x?page=2")),
        page("[2]", None),
    ]);
    let client = cached_client(config(), transport.clone(), Arc::new(MemoryCache::default()));
    let ctx = CallContext::new();

    let first: Vec<u32> = client.get_all(&ctx, "/api/v1/x").await.unwrap();
    let second: Vec<u32> = client.get_all(&ctx, "/api/v1/x").await.unwrap();

    assert_eq!(first, vec![1, 2]);
    assert_eq!(second, first);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_capped_pagination_bypasses_cache() {
    let transport = ScriptedTransport::new([
        page("[1]", Some("/api/v1/x?page=2")),
        page("[2]", None),
    ]);
    let cache = Arc::new(MemoryCache::default());
    let client = cached_client(config(), transport.clone(), cache.clone());
    let ctx = CallContext::new();

    let capped: Vec<u32> = client.get_all_limited(&ctx, "/api/v1/x", 1).await.unwrap();
    assert_eq!(capped, vec![1]);
    assert_eq!(cache.stats().await.unwrap().entries, 0);
}

#[tokio::test]
async fn test_single_page_and_full_list_do_not_collide() {
    let transport = ScriptedTransport::new([
        page("[1]", Some("/api/v1/x?page=2")),
        page("[1]", Some("/api/v1/x?page=2")),
        page("[2]", None),
    ]);
    let client = cached_client(config(), transport.clone(), Arc::new(MemoryCache::default()));
    let ctx = CallContext::new();

    let single: Vec<u32> = client.get_json(&ctx, "/api/v1/x").await.unwrap();
    let all: Vec<u32> = client.get_all(&ctx, "/api/v1/x").await.unwrap();

    assert_eq!(single, vec![1]);
    assert_eq!(all, vec![1, 2]);
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_disabled_cache_is_bypassed() {
    let transport = ScriptedTransport::new([json(200, r#"{"id":1}"#)]);
    let client = cached_client(config(), transport.clone(), Arc::new(MemoryCache::default()));
    let ctx = CallContext::new();

    client.set_cache_enabled(false).await;
    assert!(!client.cache_enabled().await);
    let _: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();
    let _: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_clear_cache() {
    let transport = ScriptedTransport::new([json(200, r#"{"id":1}"#)]);
    let client = cached_client(config(), transport.clone(), Arc::new(MemoryCache::default()));
    let ctx = CallContext::new();

    let _: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();
    client.clear_cache().await.unwrap();
    let _: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_client_without_cache() {
    let transport = ScriptedTransport::new([json(200, "{}")]);
    let client = client(config(), transport);
    assert!(!client.cache_enabled().await);
    assert!(client.cache_stats().await.unwrap().is_none());
    client.clear_cache().await.unwrap();
}

struct BrokenCache;

#[async_trait]
impl ResponseCache for BrokenCache {
    async fn get(&self, _key: &str) -> LecternResult<Option<Vec<u8>>> {
        Err(StorageError::new(StorageErrorKind::Unavailable("cache offline".into())).into())
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> LecternResult<()> {
        Err(StorageError::new(StorageErrorKind::Unavailable("cache offline".into())).into())
    }

    async fn clear(&self) -> LecternResult<()> {
        Ok(())
    }

    async fn stats(&self) -> LecternResult<CacheStats> {
        Ok(CacheStats::default())
    }
}

#[tokio::test]
async fn test_cache_failures_never_fail_requests() {
    let transport = ScriptedTransport::new([json(200, r#"{"id":1}"#), page("[1,2]", None)]);
    let client = cached_client(config(), transport.clone(), Arc::new(BrokenCache));
    let ctx = CallContext::new();

    let value: Value = client.get_json(&ctx, "/api/v1/courses/1").await.unwrap();
    assert_eq!(value["id"], 1);

    let items: Vec<u32> = client.get_all(&ctx, "/api/v1/courses").await.unwrap();
    assert_eq!(items, vec![1, 2]);
    assert_eq!(transport.call_count(), 2);
}
