//! Body encoding and decoding failures.

/// A body that is not the JSON the caller asked for.
///
/// Covers list pages that are not arrays, items or objects that do not decode
/// into the caller's type, and request bodies that fail to serialize. Never
/// retried: the next attempt would see the same bytes.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("JSON Error: {} at line {} in {}", message, line, file)]
pub struct JsonError {
    /// Decoder message, prefixed with what was being decoded
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl JsonError {
    /// Record a decoding failure at the caller's location.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern_error::JsonError;
    ///
    /// let err = JsonError::new("expected value at line 1 column 1");
    /// assert!(err.message.contains("expected value"));
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
