//! Transport error types.

/// Transport-level failure (connection refused, reset, TLS, request timeout).
///
/// Everything that prevented a response from arriving lands here, as does a
/// pagination `next` link that cannot be turned into a request. Transport
/// failures are retried; caller cancellation is reported separately through
/// [`CancelledError`](crate::CancelledError).
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("HTTP Error: {} at line {} in {}", message, line, file)]
pub struct HttpError {
    /// Message from the HTTP stack
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl HttpError {
    /// Record a transport failure at the caller's location.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern_error::HttpError;
    ///
    /// let err = HttpError::new("Connection refused");
    /// assert!(err.message.contains("Connection refused"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
