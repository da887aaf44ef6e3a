//! Client settings that cannot be loaded or do not validate.

/// Invalid or unloadable client settings.
///
/// Produced while reading `lectern.toml` or `LECTERN_*` variables, and by
/// validation (missing base address, zero quota total, zero page size).
/// Construction fails with this before any request is attempted.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// What was wrong, naming the offending setting
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Record a settings problem at the caller's location.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern_error::ConfigError;
    ///
    /// let err = ConfigError::new("base_url is required");
    /// assert!(err.message.contains("base_url"));
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
