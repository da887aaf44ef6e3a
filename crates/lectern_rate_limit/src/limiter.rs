//! Adaptive rate limiter driven by server-reported quota.
//!
//! The limiter is a single-permit bucket (GCRA via governor) whose refill rate
//! follows the quota the remote service reports on every response:
//!
//! | remaining / total | rate  |
//! |-------------------|-------|
//! | <= 0.2            | 1/s   |
//! | <= 0.5            | 2/s   |
//! | > 0.5             | 5/s   |
//!
//! Warnings are logged once per threshold until the quota recovers.

use crate::CallContext;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use lectern_error::CancelledError;
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

// Type alias for our direct rate limiter
type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request rate tiers, slowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter)]
pub enum RateTier {
    /// 1 request per second, quota nearly exhausted
    #[strum(serialize = "very-slow")]
    VerySlow,
    /// 2 requests per second, quota at or below half
    #[strum(serialize = "slow")]
    Slow,
    /// 5 requests per second
    #[strum(serialize = "default")]
    Normal,
}

impl RateTier {
    /// Permits issued per second at this tier.
    pub fn per_second(self) -> u32 {
        match self {
            RateTier::VerySlow => 1,
            RateTier::Slow => 2,
            RateTier::Normal => 5,
        }
    }

    fn bucket(self) -> DirectRateLimiter {
        let rate = NonZeroU32::new(self.per_second()).unwrap_or(NonZeroU32::MIN);
        GovernorRateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN))
    }

    /// A bucket whose only permit is already spent, so a tier change never
    /// grants an extra immediate request.
    fn drained_bucket(self) -> DirectRateLimiter {
        let bucket = self.bucket();
        let _ = bucket.check();
        bucket
    }
}

/// Quota thresholds that log a warning when crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum QuotaWarning {
    /// Remaining quota at or below half
    #[strum(serialize = "warning")]
    Warning,
    /// Remaining quota at or below a fifth
    #[strum(serialize = "critical")]
    Critical,
}

#[derive(Debug)]
struct LimiterState {
    tier: RateTier,
    fired: BTreeSet<QuotaWarning>,
    bucket: Arc<DirectRateLimiter>,
}

/// Shared, instance-owned throttle for one client.
///
/// Cloning is cheap and clones share state, so every call site of a client
/// draws from the same bucket.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = AdaptiveRateLimiter::new();
/// limiter.wait(&ctx).await?;
/// let response = transport.send(request).await?;
/// limiter.adjust_rate(remaining, 700.0).await;
/// ```
#[derive(Debug, Clone)]
pub struct AdaptiveRateLimiter {
    state: Arc<RwLock<LimiterState>>,
}

impl AdaptiveRateLimiter {
    /// Create a limiter at the default rate.
    pub fn new() -> Self {
        Self::with_tier(RateTier::Normal)
    }

    /// Create a limiter starting at a specific tier.
    pub fn with_tier(tier: RateTier) -> Self {
        debug!(%tier, "Creating adaptive rate limiter");
        Self {
            state: Arc::new(RwLock::new(LimiterState {
                tier,
                fired: BTreeSet::new(),
                bucket: Arc::new(tier.bucket()),
            })),
        }
    }

    /// Wait for one permit.
    ///
    /// Returns promptly with a cancellation error, without consuming a permit,
    /// if the call is cancelled or its deadline passes first.
    pub async fn wait(&self, ctx: &CallContext) -> Result<(), CancelledError> {
        ctx.check()?;
        let bucket = Arc::clone(&self.state.read().await.bucket);
        tokio::select! {
            biased;
            reason = ctx.cancelled() => Err(CancelledError::new(reason)),
            _ = bucket.until_ready() => Ok(()),
        }
    }

    /// Adapt the rate to the quota the server reported.
    ///
    /// A non-positive or non-finite `total` is ignored.
    #[instrument(skip(self))]
    pub async fn adjust_rate(&self, remaining: f64, total: f64) {
        if !remaining.is_finite() || !total.is_finite() || total <= 0.0 {
            debug!("Ignoring unusable quota figures");
            return;
        }
        let ratio = remaining / total;

        let mut state = self.state.write().await;
        let target = if ratio <= 0.2 {
            if state.fired.insert(QuotaWarning::Critical) {
                warn!(remaining, total, "API quota critically low, throttling to 1 request/second");
            }
            RateTier::VerySlow
        } else if ratio <= 0.5 {
            if state.fired.insert(QuotaWarning::Warning) {
                warn!(remaining, total, "API quota below half, throttling to 2 requests/second");
            }
            RateTier::Slow
        } else if state.tier < RateTier::Normal {
            state.fired.clear();
            RateTier::Normal
        } else {
            return;
        };

        if target == state.tier {
            return;
        }

        info!(from = %state.tier, to = %target, ratio, "Adjusting request rate");
        state.tier = target;
        state.bucket = Arc::new(target.drained_bucket());
    }

    /// Current rate in requests per second.
    pub async fn rate(&self) -> f64 {
        f64::from(self.state.read().await.tier.per_second())
    }

    /// Current tier.
    pub async fn tier(&self) -> RateTier {
        self.state.read().await.tier
    }

    /// Warnings fired since the last recovery.
    pub async fn fired_warnings(&self) -> Vec<QuotaWarning> {
        self.state.read().await.fired.iter().copied().collect()
    }
}

impl Default for AdaptiveRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
