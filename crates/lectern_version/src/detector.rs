//! One-shot version detection with a persisted cache.

use crate::{CachedVersionRecord, MemoryVersionStore, RemoteVersion, VersionStore, record_key};
use chrono::{Duration, Utc};
use lectern_error::LecternResult;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Response header carrying `{"version": "..."}`.
pub const META_HEADER: &str = "x-canvas-meta";

#[derive(Debug, Deserialize)]
struct MetaEnvelope {
    version: Option<String>,
}

/// Extract the release version from the meta header, if present and parsable.
pub fn version_from_headers(headers: &HeaderMap) -> Option<RemoteVersion> {
    let raw = headers.get(META_HEADER)?.to_str().ok()?;
    let envelope: MetaEnvelope = serde_json::from_str(raw).ok()?;
    RemoteVersion::parse(&envelope.version?)
}

/// Detects the remote version once per base address and remembers it.
///
/// Successful detections are stored for the TTL (24 hours by default). A failed
/// detection stores the [`RemoteVersion::unknown`] placeholder flagged as
/// unknown, so the failure is reported once per TTL window and a genuine
/// detection takes over once the entry expires.
///
/// # Example
///
/// ```rust,ignore
/// let detector = VersionDetector::new(Arc::new(FileVersionStore::in_user_cache()?));
/// let version = detector
///     .resolve("https://school.example", || async { probe_headers().await })
///     .await?;
/// ```
#[derive(Clone)]
pub struct VersionDetector {
    store: Arc<dyn VersionStore>,
    ttl: Duration,
}

impl VersionDetector {
    /// Create a detector over a store.
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self {
            store,
            ttl: Duration::hours(24),
        }
    }

    /// Override the record TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Record TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read a live record for `base_url`, removing it if it has expired.
    ///
    /// Store failures are logged and treated as a miss.
    #[instrument(skip(self))]
    pub async fn cached(&self, base_url: &str) -> Option<CachedVersionRecord> {
        let key = record_key(base_url);
        let record = match self.store.load(&key).await {
            Ok(record) => record?,
            Err(e) => {
                warn!(error = %e, "Failed to read version cache");
                return None;
            }
        };

        if record.is_expired() {
            debug!(version = %record.version, "Version cache entry expired, removing");
            if let Err(e) = self.store.remove(&key).await {
                warn!(error = %e, "Failed to remove expired version cache entry");
            }
            return None;
        }
        Some(record)
    }

    /// Resolve the version for `base_url`, probing only on a cache miss.
    ///
    /// `probe` issues one lightweight request and yields its response headers.
    /// An unusable probe yields the unknown placeholder.
    ///
    /// # Errors
    ///
    /// Returns the probe's [`CancelledError`](lectern_error::CancelledError)
    /// when it was cancelled; nothing is persisted in that case.
    #[instrument(skip(self, probe))]
    pub async fn resolve<F, Fut>(&self, base_url: &str, probe: F) -> LecternResult<RemoteVersion>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LecternResult<HeaderMap>>,
    {
        if let Some(record) = self.cached(base_url).await {
            debug!(version = %record.version, unknown = record.unknown, "Using cached version");
            return Ok(record.version);
        }

        let detected = match probe().await {
            Ok(headers) => version_from_headers(&headers),
            Err(e) if e.is_cancelled() => {
                debug!("Version probe cancelled");
                return Err(e);
            }
            Err(e) => {
                debug!(error = %e, "Version probe failed");
                None
            }
        };

        let (version, unknown) = match detected {
            Some(version) => {
                info!(%version, "Detected remote version");
                (version, false)
            }
            None => {
                warn!("Could not detect remote version, assuming latest");
                (RemoteVersion::unknown(), true)
            }
        };

        self.remember(base_url, &version, unknown).await;
        Ok(version)
    }

    async fn remember(&self, base_url: &str, version: &RemoteVersion, unknown: bool) {
        let record = CachedVersionRecord {
            version: version.clone(),
            expiration: Utc::now() + self.ttl,
            unknown,
        };
        if let Err(e) = self.store.save(&record_key(base_url), &record).await {
            warn!(error = %e, "Failed to persist detected version");
        }
    }
}

impl Default for VersionDetector {
    fn default() -> Self {
        Self::new(Arc::new(MemoryVersionStore::new()))
    }
}

impl std::fmt::Debug for VersionDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionDetector")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
