//! Tests for version detection through the client.

mod test_utils;

use lectern_client::{ApiClient, ClientConfig, Credential};
use lectern_rate_limit::CallContext;
use lectern_version::{FileVersionStore, MemoryVersionStore, VersionStore, record_key};
use std::sync::Arc;
use test_utils::*;

fn versioned_client(
    config: ClientConfig,
    transport: Arc<ScriptedTransport>,
    store: Arc<dyn VersionStore>,
) -> ApiClient {
    ApiClient::builder(config)
        .with_credential(Credential::fixed(TOKEN))
        .with_transport(transport)
        .with_version_store(store)
        .build()
        .unwrap()
}

fn meta(version: &str) -> Step {
    json_with_headers(200, "{}", &[("x-canvas-meta", &format!(r#"{{"version":"{version}"}}"#))])
}

#[tokio::test]
async fn test_detects_once_per_client() {
    let transport = ScriptedTransport::new([meta("2024.01.05")]);
    let client = client(config(), transport.clone());
    let ctx = CallContext::new();

    let version = client.version(&ctx).await.unwrap();
    assert_eq!(version.as_tuple(), (2024, 1, 5));
    assert!(client.is_at_least(&ctx, 2023, 9, 9).await.unwrap());
    assert!(!client.is_at_least(&ctx, 2024, 1, 6).await.unwrap());
    assert!(client.supports_feature(&ctx, "discussion_checkpoints").await.unwrap());
    assert!(!client.supports_feature(&ctx, "block_editor").await.unwrap());
    assert!(client.supports_feature(&ctx, "not_a_gated_feature").await.unwrap());

    assert_eq!(transport.urls(), vec![format!("{BASE}/api/v1/users/self")]);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_detection() {
    let transport = ScriptedTransport::new([meta("2024.6.1")]);
    let client = client(config(), transport.clone());

    let (a, b) = tokio::join!(
        client.version(&CallContext::new()),
        client.version(&CallContext::new())
    );
    assert_eq!(a, b);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_failed_detection_assumes_latest() {
    let transport = ScriptedTransport::new([json(401, "")]);
    let store = Arc::new(MemoryVersionStore::new());
    let client = versioned_client(config(), transport, store.clone());

    let version = client.version(&CallContext::new()).await.unwrap();
    assert!(version.is_unknown());
    assert!(client.supports_feature(&CallContext::new(), "block_editor").await.unwrap());

    let record = store.load(&record_key(BASE)).await.unwrap().unwrap();
    assert!(record.unknown);
}

#[tokio::test]
async fn test_dry_run_skips_detection() {
    let transport = ScriptedTransport::new([]);
    let store = Arc::new(MemoryVersionStore::new());
    let client = versioned_client(config().with_dry_run(true), transport.clone(), store.clone());

    assert!(client.version(&CallContext::new()).await.unwrap().is_unknown());
    assert_eq!(transport.call_count(), 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_persisted_version_reused_by_next_client() {
    let dir = tempfile::tempdir().unwrap();

    let first_transport = ScriptedTransport::new([meta("2023.7.2")]);
    let first = versioned_client(
        config(),
        first_transport,
        Arc::new(FileVersionStore::new(dir.path()).unwrap()),
    );
    first.version(&CallContext::new()).await.unwrap();

    let second_transport = ScriptedTransport::new([meta("2099.1.1")]);
    let second = versioned_client(
        config(),
        second_transport.clone(),
        Arc::new(FileVersionStore::new(dir.path()).unwrap()),
    );
    let version = second.version(&CallContext::new()).await.unwrap();

    assert_eq!(version.as_tuple(), (2023, 7, 2));
    assert_eq!(second_transport.call_count(), 0);
}

#[tokio::test]
async fn test_cancelled_detection_is_retried_by_next_caller() {
    let transport = ScriptedTransport::new([meta("2024.01.05")]);
    let store = Arc::new(MemoryVersionStore::new());
    let client = versioned_client(config(), transport.clone(), store.clone());

    let cancelled = CallContext::new();
    cancelled.cancel();
    let err = client.version(&cancelled).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(client.supports_feature(&cancelled, "block_editor").await.is_err());
    assert_eq!(transport.call_count(), 0);
    assert!(store.is_empty().await);

    let ctx = CallContext::new();
    assert_eq!(client.version(&ctx).await.unwrap().as_tuple(), (2024, 1, 5));
    assert!(!client.supports_feature(&ctx, "block_editor").await.unwrap());
    assert_eq!(transport.call_count(), 1);
}
