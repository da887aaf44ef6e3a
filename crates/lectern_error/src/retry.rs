//! Retry classification for errors.

/// Trait for errors that support retry logic.
///
/// Transient failures (dropped connections, 429, 5xx gateway errors) return
/// true. Permanent failures (400, 401, decode errors) and caller cancellation
/// return false.
///
/// # Examples
///
/// ```
/// use lectern_error::{HttpError, LecternError, RetryableError};
///
/// let err: LecternError = HttpError::new("connection reset").into();
/// assert!(err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

/// Status codes worth retrying: 429 and the transient 5xx family.
pub fn is_retryable_status(status_code: u16) -> bool {
    matches!(status_code, 429 | 500 | 502 | 503 | 504)
}
