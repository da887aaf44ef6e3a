//! Rate limiting and retry for the Lectern REST client core.
//!
//! - [`AdaptiveRateLimiter`] throttles request issuance to the quota the
//!   service reports, using a governor bucket whose rate follows
//!   `X-Rate-Limit-Remaining`.
//! - [`RetryPolicy`] retries transient failures with bounded exponential
//!   backoff on top of tokio-retry2.
//! - [`CallContext`] carries caller cancellation and deadlines into both
//!   suspension points.
//! - [`QuotaDetector`] parses the quota headers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod detector;
mod limiter;
mod retry;

pub use context::CallContext;
pub use detector::{
    QuotaDetector, QuotaSnapshot, RATE_LIMIT_REMAINING_HEADER, REQUEST_COST_HEADER,
    parse_header_f64,
};
pub use limiter::{AdaptiveRateLimiter, QuotaWarning, RateTier};
pub use retry::RetryPolicy;
