//! Persisted version records.

use crate::RemoteVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A detected version as persisted between client instances.
///
/// Serialized as
/// `{"version":{"major":..,"minor":..,"patch":..,"raw":".."},"expiration":"<RFC3339>","unknown":false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedVersionRecord {
    /// Detected (or placeholder) version
    pub version: RemoteVersion,
    /// When the record stops being trusted
    pub expiration: DateTime<Utc>,
    /// Whether detection failed and `version` is the placeholder
    pub unknown: bool,
}

impl CachedVersionRecord {
    /// Whether the record is past its expiration at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Whether the record is past its expiration.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Store key for a base address: hex SHA-256 of the address.
pub fn record_key(base_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    format!("{:x}", hasher.finalize())
}
