//! Structured errors for failed API responses.

use std::fmt;

/// Documentation reference attached to rate-limit errors.
pub const RATE_LIMIT_DOCS_URL: &str = "https://canvas.instructure.com/doc/api/file.throttling.html";

/// A single error message reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiErrorDetail {
    /// Message text as reported by the service
    pub message: String,
}

impl ApiErrorDetail {
    /// Create a detail from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A response with status >= 400, decoded into an inspectable form.
///
/// Immutable once constructed. The suggestion and documentation reference are
/// derived from the status code.
///
/// # Examples
///
/// ```
/// use lectern_error::{ApiError, ApiErrorDetail};
///
/// let err = ApiError::new(404, vec![ApiErrorDetail::new("The specified resource does not exist.")]);
/// assert!(err.is_not_found());
/// assert!(err.suggestion().unwrap().contains("Verify"));
/// ```
#[derive(Debug, Clone, derive_more::Error)]
pub struct ApiError {
    status_code: u16,
    details: Vec<ApiErrorDetail>,
    suggestion: Option<String>,
    docs_url: Option<String>,
    line: u32,
    file: &'static str,
}

impl ApiError {
    /// Create a structured error for a status code and its decoded details.
    #[track_caller]
    pub fn new(status_code: u16, details: Vec<ApiErrorDetail>) -> Self {
        let location = std::panic::Location::caller();
        let docs_url = (status_code == 429).then(|| RATE_LIMIT_DOCS_URL.to_string());
        Self {
            status_code,
            details,
            suggestion: suggestion_for(status_code).map(str::to_string),
            docs_url,
            line: location.line(),
            file: location.file(),
        }
    }

    /// HTTP status code of the failed response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Error messages reported by the service.
    pub fn details(&self) -> &[ApiErrorDetail] {
        &self.details
    }

    /// Ready-to-display remediation hint, if the status has one.
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Documentation reference, set for rate-limit errors.
    pub fn docs_url(&self) -> Option<&str> {
        self.docs_url.as_deref()
    }

    /// All detail messages joined with `"; "`.
    pub fn message(&self) -> String {
        self.details
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Line number where the error was created.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// File where the error was created.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Status 429.
    pub fn is_rate_limit(&self) -> bool {
        self.status_code == 429
    }

    /// Status 401.
    pub fn is_auth(&self) -> bool {
        self.status_code == 401
    }

    /// Status 403.
    pub fn is_forbidden(&self) -> bool {
        self.status_code == 403
    }

    /// Status 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404
    }

    /// Any 5xx status.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error: HTTP {}", self.status_code)?;
        if !self.details.is_empty() {
            write!(f, ": {}", self.message())?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        write!(f, " at line {} in {}", self.line, self.file)
    }
}

/// Remediation hint for a status code.
pub fn suggestion_for(status_code: u16) -> Option<&'static str> {
    match status_code {
        401 => Some("Your access token is invalid or expired. Re-authenticate and try again."),
        403 => Some(
            "You do not have permission for this action. Check your role in the course or account, or ask an administrator.",
        ),
        404 => Some("The resource was not found. Verify the ID and that you have access to it."),
        422 => Some("The request failed validation. Check the submitted fields and their values."),
        429 => Some("Rate limit exceeded. Wait before retrying and reduce concurrent requests."),
        500..=599 => Some("The server encountered an error. Try again later."),
        _ => None,
    }
}
