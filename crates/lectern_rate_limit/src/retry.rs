//! Bounded exponential backoff.

use crate::CallContext;
use derive_getters::Getters;
use lectern_error::{CancelledError, RetryableError, is_retryable_status};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// How many times and how patiently to retry a failed attempt.
///
/// `backoff(n) = min(max_backoff, initial_backoff * 2^n)`. With the defaults
/// (3 retries, 1s initial, 8s cap) the waits are 1s, 2s, 4s.
///
/// # Example
///
/// ```
/// use lectern_rate_limit::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.backoff(0), Duration::from_secs(1));
/// assert_eq!(policy.backoff(4), Duration::from_secs(8));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: usize,
    /// Wait before the first retry
    initial_backoff: Duration,
    /// Upper bound for any single wait
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_retries: usize, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
        }
    }

    /// Wait before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// The full backoff schedule, one entry per allowed retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let policy = self.clone();
        (0..self.max_retries).map(move |n| policy.backoff(u32::try_from(n).unwrap_or(u32::MAX)))
    }

    /// Whether a response status warrants another attempt.
    pub fn should_retry_status(&self, status_code: u16) -> bool {
        is_retryable_status(status_code)
    }

    /// Run `operation`, retrying retryable failures with backoff.
    ///
    /// Non-retryable failures return on first occurrence. Once the retries are
    /// used up, the last failure is returned unchanged. Cancellation, whether
    /// observed before the first attempt, during an attempt or during a
    /// backoff sleep, ends the loop and surfaces as the error.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let response = policy.execute(&ctx, || transport.send(request.clone())).await?;
    /// ```
    pub async fn execute<F, Fut, T, E>(&self, ctx: &CallContext, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + From<CancelledError> + Display,
    {
        ctx.check()?;

        let max_retries = self.max_retries;
        let mut attempt = 0usize;
        let retry = Retry::spawn(self.delays(), || {
            attempt += 1;
            let current = attempt;
            let fut = operation();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_retryable() => {
                        if current <= max_retries {
                            warn!(attempt = current, max_retries, error = %e, "Transient failure, will retry");
                        } else {
                            warn!(attempt = current, error = %e, "Transient failure, retries exhausted");
                        }
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => {
                        debug!(attempt = current, error = %e, "Permanent failure, not retrying");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        });

        tokio::select! {
            biased;
            reason = ctx.cancelled() => Err(CancelledError::new(reason).into()),
            result = retry => result,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        let waits: Vec<_> = (0..5).map(|n| policy.backoff(n)).collect();
        assert_eq!(
            waits,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn test_backoff_saturates_on_huge_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(40), Duration::from_secs(8));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_non_decreasing() {
        let policy = RetryPolicy::new(10, Duration::from_millis(300), Duration::from_secs(5));
        let waits: Vec<_> = (0..12).map(|n| policy.backoff(n)).collect();
        assert!(waits.windows(2).all(|w| w[0] <= w[1]));
        assert!(waits.iter().all(|w| *w <= Duration::from_secs(5)));
    }

    #[test]
    fn test_delays_has_one_entry_per_retry() {
        let policy = RetryPolicy::default().with_max_retries(2);
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.should_retry_status(status), "{status} should retry");
        }
        for status in [200, 400, 401, 403, 404, 422, 501] {
            assert!(!policy.should_retry_status(status), "{status} should not retry");
        }
    }
}
