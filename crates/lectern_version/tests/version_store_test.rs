//! Tests for the filesystem version store.

use chrono::{Duration, Utc};
use lectern_error::LecternErrorKind;
use lectern_version::{
    CachedVersionRecord, FileVersionStore, RemoteVersion, VersionDetector, VersionStore, record_key,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn record(version: RemoteVersion) -> CachedVersionRecord {
    CachedVersionRecord {
        version,
        expiration: Utc::now() + Duration::hours(24),
        unknown: false,
    }
}

#[tokio::test]
async fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVersionStore::new(dir.path()).unwrap();
    let key = record_key("https://school.example");

    let saved = record(RemoteVersion::new(2024, 1, 5, "2024.01.05"));
    store.save(&key, &saved).await.unwrap();

    let loaded = store.load(&key).await.unwrap().unwrap();
    assert_eq!(loaded.version.raw, "2024.01.05");
    assert_eq!(loaded, saved);
    assert!(dir.path().join(format!("{key}.json")).exists());
    assert!(!dir.path().join(format!("{key}.tmp")).exists());
}

#[tokio::test]
async fn test_missing_record_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVersionStore::new(dir.path()).unwrap();
    assert!(store.load("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVersionStore::new(dir.path()).unwrap();
    let key = record_key("https://school.example");

    store.save(&key, &record(RemoteVersion::unknown())).await.unwrap();
    store.remove(&key).await.unwrap();
    store.remove(&key).await.unwrap();
    assert!(store.load(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_file_reports_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVersionStore::new(dir.path()).unwrap();
    std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();

    let err = store.load("bad").await.unwrap_err();
    assert!(matches!(err.kind(), LecternErrorKind::Storage(_)));
}

#[tokio::test]
async fn test_creates_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("lectern").join("version");
    let store = FileVersionStore::new(&nested).unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.base_path(), nested.as_path());
}

#[tokio::test]
async fn test_detection_survives_across_detectors() {
    let dir = tempfile::tempdir().unwrap();
    let base = "https://school.example";

    let first = VersionDetector::new(Arc::new(FileVersionStore::new(dir.path()).unwrap()));
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        lectern_version::META_HEADER,
        reqwest::header::HeaderValue::from_static(r#"{"version":"2023.7.2"}"#),
    );
    first.resolve(base, || async move { Ok(headers) }).await.unwrap();

    let second = VersionDetector::new(Arc::new(FileVersionStore::new(dir.path()).unwrap()));
    let probes = AtomicUsize::new(0);
    let version = second
        .resolve(base, || async {
            probes.fetch_add(1, Ordering::SeqCst);
            Ok(reqwest::header::HeaderMap::new())
        })
        .await
        .unwrap();
    assert_eq!(version.as_tuple(), (2023, 7, 2));
    assert_eq!(probes.load(Ordering::SeqCst), 0);
}
