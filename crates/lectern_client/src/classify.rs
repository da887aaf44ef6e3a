//! Turning failed responses into [`ApiError`]s.

use crate::ApiResponse;
use lectern_error::{ApiError, ApiErrorDetail};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Decode a response with status >= 400.
///
/// `{"errors": [{"message": ...}]}` bodies yield one detail per message.
/// Anything else yields the raw body text as the single detail, or the status
/// reason phrase when the body is empty.
pub fn classify_response(response: &ApiResponse) -> ApiError {
    let details = match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .into_iter()
            .map(|e| ApiErrorDetail::new(e.message))
            .collect(),
        _ => {
            let text = response.text();
            let text = text.trim();
            let message = if text.is_empty() {
                reqwest::StatusCode::from_u16(response.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                text.to_string()
            };
            vec![ApiErrorDetail::new(message)]
        }
    };

    debug!(status = response.status, details = details.len(), "Classified error response");
    ApiError::new(response.status, details)
}
