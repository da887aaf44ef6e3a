//! In-memory response cache with TTL and LRU eviction.

use crate::{CacheStats, ResponseCache};
use derive_getters::Getters;
use lectern_error::LecternResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Cached payload with expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.created_at.elapsed())
    }
}

/// Configuration for [`MemoryCache`].
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct MemoryCacheConfig {
    /// TTL for cached entries (seconds)
    #[serde(default = "default_ttl")]
    #[builder(default = "default_ttl()")]
    default_ttl: u64,

    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_size")]
    #[builder(default = "default_max_size()")]
    max_size: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

fn default_max_size() -> usize {
    1000
}

fn default_enabled() -> bool {
    true
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            max_size: default_max_size(),
            enabled: default_enabled(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    access_order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl Inner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
        self.access_order.push_back(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    fn evict_lru(&mut self) {
        if let Some(key) = self.access_order.pop_front() {
            tracing::debug!(key = %key, "Evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

/// Bounded in-memory [`ResponseCache`].
///
/// Entries expire after the configured TTL and the least recently used entry
/// is evicted once `max_size` is reached.
///
/// # Example
///
/// ```
/// use lectern_cache::{MemoryCache, MemoryCacheConfig, ResponseCache};
///
/// # async fn example() -> lectern_error::LecternResult<()> {
/// let cache = MemoryCache::new(MemoryCacheConfig::default());
/// cache.set("key", b"[1,2,3]".to_vec()).await?;
/// assert_eq!(cache.get("key").await?, Some(b"[1,2,3]".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryCache {
    config: MemoryCacheConfig,
    inner: Mutex<Inner>,
}

impl MemoryCache {
    /// Create a new cache with configuration.
    pub fn new(config: MemoryCacheConfig) -> Self {
        tracing::debug!(
            default_ttl = config.default_ttl,
            max_size = config.max_size,
            enabled = config.enabled,
            "Creating new MemoryCache"
        );
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Cache configuration.
    pub fn config(&self) -> &MemoryCacheConfig {
        &self.config
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.forget(key);
        }
        if !expired.is_empty() {
            tracing::info!(
                removed = expired.len(),
                remaining = inner.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        expired.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(MemoryCacheConfig::default())
    }
}

#[async_trait::async_trait]
impl ResponseCache for MemoryCache {
    #[tracing::instrument(skip(self), fields(cache = "memory"))]
    async fn get(&self, key: &str) -> LecternResult<Option<Vec<u8>>> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, returning None");
            return Ok(None);
        }

        let mut inner = self.inner.lock().await;
        let expired = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return Ok(None);
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            tracing::debug!("Cache entry expired, removing");
            inner.forget(key);
            inner.misses += 1;
            return Ok(None);
        }

        inner.touch(key);
        inner.hits += 1;
        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        tracing::debug!("Cache hit");
        Ok(value)
    }

    #[tracing::instrument(skip(self, value), fields(cache = "memory", size = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>) -> LecternResult<()> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, skipping insert");
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        if inner.entries.len() >= self.config.max_size && !inner.entries.contains_key(key) {
            inner.evict_lru();
        }
        inner.touch(key);
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl: Duration::from_secs(self.config.default_ttl),
            },
        );
        Ok(())
    }

    async fn clear(&self) -> LecternResult<()> {
        let mut inner = self.inner.lock().await;
        let count = inner.entries.len();
        inner.entries.clear();
        inner.access_order.clear();
        tracing::info!(cleared = count, "Cleared cache");
        Ok(())
    }

    async fn stats(&self) -> LecternResult<CacheStats> {
        let inner = self.inner.lock().await;
        Ok(CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        })
    }
}
