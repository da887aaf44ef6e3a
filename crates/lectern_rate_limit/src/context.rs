//! Per-call cancellation and deadline.

use lectern_error::{CancelReason, CancelledError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation scope for one logical call.
///
/// Carries a [`CancellationToken`] and an optional deadline. The rate limiter
/// wait and the retry backoff sleep both watch it and return promptly once
/// either fires.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
/// let courses: Vec<Course> = client.get_all(&ctx, "/api/v1/courses").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never cancels on its own.
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// A context driven by an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Set a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel the call.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A context cancelled together with this one but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Fail immediately if the call is already cancelled or past its deadline.
    #[track_caller]
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.token.is_cancelled() {
            return Err(CancelledError::new(CancelReason::Cancelled));
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Err(CancelledError::new(CancelReason::DeadlineExceeded));
        }
        Ok(())
    }

    /// Resolves once the call is cancelled or its deadline passes.
    pub async fn cancelled(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
