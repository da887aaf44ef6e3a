//! Top-level error wrapper types.

use crate::{
    ApiError, CancelledError, ConfigError, CredentialError, HttpError, JsonError, RetryableError,
    StorageError, is_retryable_status,
};

/// Every failure the client core can report.
///
/// # Examples
///
/// ```
/// use lectern_error::{LecternError, HttpError};
///
/// let http_err = HttpError::new("Connection failed");
/// let err: LecternError = http_err.into();
/// assert!(format!("{}", err).contains("HTTP Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum LecternErrorKind {
    /// Transport-level failure
    #[from(HttpError)]
    Http(HttpError),
    /// Response with status >= 400
    #[from(ApiError)]
    Api(ApiError),
    /// Caller cancellation or deadline expiry
    #[from(CancelledError)]
    Cancelled(CancelledError),
    /// JSON encoding/decoding error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Token could not be obtained
    #[from(CredentialError)]
    Credential(CredentialError),
    /// Cache or version store error
    #[from(StorageError)]
    Storage(StorageError),
}

/// Lectern error with kind discrimination.
///
/// # Examples
///
/// ```
/// use lectern_error::{LecternResult, ConfigError};
///
/// fn might_fail() -> LecternResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Lectern Error: {}", _0)]
pub struct LecternError(Box<LecternErrorKind>);

impl LecternError {
    /// Create a new error from a kind.
    pub fn new(kind: LecternErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &LecternErrorKind {
        &self.0
    }

    /// The structured API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self.kind() {
            LecternErrorKind::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the caller cancelled or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), LecternErrorKind::Cancelled(_))
    }

    /// Status 429.
    pub fn is_rate_limit(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_rate_limit)
    }

    /// Status 401.
    pub fn is_auth(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_auth)
    }

    /// Status 403.
    pub fn is_forbidden(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_forbidden)
    }

    /// Status 404.
    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    /// Any 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_server_error)
    }
}

impl RetryableError for LecternError {
    fn is_retryable(&self) -> bool {
        match self.kind() {
            LecternErrorKind::Http(_) => true,
            LecternErrorKind::Api(err) => is_retryable_status(err.status_code()),
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to LecternErrorKind
impl<T> From<T> for LecternError
where
    T: Into<LecternErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Lectern operations.
pub type LecternResult<T> = std::result::Result<T, LecternError>;
