//! Rendering requests instead of sending them.

use crate::ApiRequest;
use crate::credential::REDACTED;
use reqwest::header::AUTHORIZATION;

/// Formats a request as a command line for dry runs.
pub trait DryRunRenderer: Send + Sync {
    /// Render `request`; the bearer token is redacted unless `show_token`.
    fn render(&self, request: &ApiRequest, show_token: bool) -> String;
}

/// Renders requests as `curl` invocations.
///
/// # Example
///
/// ```
/// use lectern_client::{ApiRequest, CurlRenderer, DryRunRenderer};
/// use reqwest::Method;
///
/// let request = ApiRequest::new(Method::GET, "https://school.example/api/v1/courses");
/// assert_eq!(
///     CurlRenderer.render(&request, false),
///     "curl -X GET 'https://school.example/api/v1/courses'"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CurlRenderer;

impl DryRunRenderer for CurlRenderer {
    fn render(&self, request: &ApiRequest, show_token: bool) -> String {
        let mut parts = vec![
            "curl".to_string(),
            "-X".to_string(),
            request.method.to_string(),
            shell_quote(&request.url),
        ];

        for (name, value) in &request.headers {
            let value = if name == AUTHORIZATION && !show_token {
                format!("Bearer {REDACTED}")
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            parts.push("-H".to_string());
            parts.push(shell_quote(&format!("{}: {}", name, value)));
        }

        if let Some(body) = &request.body {
            parts.push("-d".to_string());
            parts.push(shell_quote(&String::from_utf8_lossy(body)));
        }

        parts.join(" ")
    }
}

/// Single-quote for POSIX shells.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
