//! Response caching for the Lectern REST client core.
//!
//! The client consults an injected [`ResponseCache`] around idempotent reads.
//! The cache is a plain byte store keyed by opaque strings; the client decides
//! what goes in (raw response bodies, aggregated pages) and how keys are built
//! ([`resource_key`], [`pages_key`]).
//!
//! [`MemoryCache`] is the bundled implementation: TTL expiry with LRU eviction.

#![warn(missing_docs)]

use lectern_error::LecternResult;

mod keys;
mod memory;

pub use keys::{PAGES_NAMESPACE, pages_key, resource_key};
pub use memory::{CacheEntry, MemoryCache, MemoryCacheConfig, MemoryCacheConfigBuilder};

/// Counters reported by a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Live entries
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
}

/// Byte-oriented cache capability.
///
/// Implementations must be safe to share between concurrent callers. Errors
/// are reported but the client treats every cache operation as best-effort.
#[async_trait::async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a payload.
    async fn get(&self, key: &str) -> LecternResult<Option<Vec<u8>>>;

    /// Store a payload, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> LecternResult<()>;

    /// Drop every entry.
    async fn clear(&self) -> LecternResult<()>;

    /// Current counters.
    async fn stats(&self) -> LecternResult<CacheStats>;
}
