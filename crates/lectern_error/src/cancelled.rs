//! Cancellation error types.

/// Why a call stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CancelReason {
    /// The caller cancelled the call.
    #[display("cancelled by caller")]
    Cancelled,
    /// The call deadline passed.
    #[display("deadline exceeded")]
    DeadlineExceeded,
}

/// Caller-initiated cancellation or deadline expiry.
///
/// Never retried; surfaces on first occurrence.
///
/// # Examples
///
/// ```
/// use lectern_error::{CancelReason, CancelledError};
///
/// let err = CancelledError::new(CancelReason::DeadlineExceeded);
/// assert!(format!("{}", err).contains("deadline exceeded"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cancelled: {} at line {} in {}", reason, line, file)]
pub struct CancelledError {
    /// What stopped the call
    pub reason: CancelReason,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CancelledError {
    /// Create a new cancellation error with automatic location tracking.
    #[track_caller]
    pub fn new(reason: CancelReason) -> Self {
        let location = std::panic::Location::caller();
        Self {
            reason,
            line: location.line(),
            file: location.file(),
        }
    }
}
