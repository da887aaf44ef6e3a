//! Quota figures from API response headers.
//!
//! The service reports its remaining request budget on every response in
//! `X-Rate-Limit-Remaining` (a floating-point figure) and the cost of the
//! request just served in `X-Request-Cost`. The detector parses them and keeps
//! the most recent snapshot for diagnostics.

use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Header carrying the remaining quota.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-rate-limit-remaining";

/// Header carrying the cost of the request just served.
pub const REQUEST_COST_HEADER: &str = "x-request-cost";

/// Quota figures reported by one response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaSnapshot {
    /// Remaining request budget
    pub remaining: f64,
    /// Cost of the request, if reported
    pub cost: Option<f64>,
}

/// Extracts and caches quota figures from response headers.
///
/// # Example
///
/// ```rust,ignore
/// let detector = QuotaDetector::new();
///
/// if let Some(snapshot) = detector.detect(response.headers()).await {
///     limiter.adjust_rate(snapshot.remaining, quota_total).await;
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuotaDetector {
    /// Most recent snapshot (updated on each response carrying quota headers)
    last: Arc<RwLock<Option<QuotaSnapshot>>>,
}

impl QuotaDetector {
    /// Create a new detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse quota headers; `None` when the remaining figure is missing or not numeric.
    #[instrument(skip(self, headers))]
    pub async fn detect(&self, headers: &HeaderMap) -> Option<QuotaSnapshot> {
        let remaining = parse_header_f64(headers, RATE_LIMIT_REMAINING_HEADER)?;
        let cost = parse_header_f64(headers, REQUEST_COST_HEADER);
        debug!(remaining, ?cost, "Detected quota from headers");

        let snapshot = QuotaSnapshot { remaining, cost };
        *self.last.write().await = Some(snapshot);
        Some(snapshot)
    }

    /// Most recently detected snapshot.
    pub async fn last(&self) -> Option<QuotaSnapshot> {
        *self.last.read().await
    }

    /// Forget the cached snapshot.
    pub async fn clear(&self) {
        *self.last.write().await = None;
    }
}

/// Helper to parse a finite f64 from a header value.
pub fn parse_header_f64(headers: &HeaderMap, key: &str) -> Option<f64> {
    headers
        .get(key)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
