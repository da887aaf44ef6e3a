//! The wire boundary: one request in, one response out.

use async_trait::async_trait;
use lectern_error::{HttpError, JsonError, LecternResult};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// A fully prepared outbound request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP verb
    pub method: Method,
    /// Absolute URL, query included
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Encoded body, if any
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Add a header. Values that are not valid header text are dropped.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => debug!(header = %name, "Dropping header with invalid value"),
        }
        self
    }

    /// Add an already validated header value.
    pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a body.
    pub fn with_body(mut self, body: Option<Vec<u8>>) -> Self {
        self.body = body;
        self
    }
}

/// A completed response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Create a response.
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError`] if the body does not decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> LecternResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| JsonError::new(format!("Failed to decode response body: {}", e)).into())
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A header value, if present and valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends one request and reads the whole response.
///
/// Implementations report failures that prevented a response from arriving as
/// [`HttpError`]; any response that did arrive, whatever its status, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one network attempt.
    async fn send(&self, request: ApiRequest) -> LecternResult<ApiResponse>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// The connection pool lives as long as the transport; idle connections are
/// closed after the pool idle timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with a per-request timeout and pool idle timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the underlying client cannot be constructed.
    pub fn new(request_timeout: Duration, pool_idle_timeout: Duration) -> LecternResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .pool_idle_timeout(pool_idle_timeout)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: ApiRequest) -> LecternResult<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = ?e, "Request failed");
            HttpError::new(format!("Request failed: {}", e))
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            error!(error = ?e, "Failed to read response body");
            HttpError::new(format!("Failed to read response body: {}", e))
        })?;

        debug!(status, bytes = body.len(), "Received response");
        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-cost", HeaderValue::from_static("1.5"));
        let response = ApiResponse::new(200, headers, br#"{"id":7}"#.to_vec());

        assert!(response.is_success());
        assert_eq!(response.header("x-request-cost"), Some("1.5"));
        assert_eq!(response.header("link"), None);
        assert_eq!(response.text(), r#"{"id":7}"#);

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_json_decode_failure_is_json_error() {
        let response = ApiResponse::new(200, HeaderMap::new(), b"<html>".to_vec());
        let err = response.json::<Vec<u32>>().unwrap_err();
        assert!(matches!(err.kind(), lectern_error::LecternErrorKind::Json(_)));
    }

    #[test]
    fn test_invalid_header_value_is_dropped() {
        let request = ApiRequest::new(Method::GET, "https://school.example/api/v1/courses")
            .with_header(reqwest::header::USER_AGENT, "bad\nvalue");
        assert!(request.headers.is_empty());
    }
}
