//! The single funnel every outbound call passes through.

use crate::{
    ApiRequest, ApiResponse, ClientConfig, Credential, CurlRenderer, DryRunRenderer, Transport,
    classify_response,
};
use lectern_error::{CancelledError, CredentialError, LecternError, LecternResult, RetryableError};
use lectern_rate_limit::{AdaptiveRateLimiter, CallContext, QuotaDetector, RetryPolicy};
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

/// Query parameter that makes the service act as another user.
pub const MASQUERADE_PARAM: &str = "as_user_id";

/// Outcome of one attempt that the retry loop may discard.
#[derive(Debug)]
enum AttemptFailure {
    /// A response arrived with a retryable status
    Status(ApiResponse),
    /// No usable response
    Failed(LecternError),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(response) => write!(f, "HTTP {}", response.status),
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl RetryableError for AttemptFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status(_) => true,
            Self::Failed(e) => e.is_retryable(),
        }
    }
}

impl From<CancelledError> for AttemptFailure {
    fn from(err: CancelledError) -> Self {
        Self::Failed(err.into())
    }
}

/// Attaches credentials, throttles, retries and classifies.
///
/// One executor is shared by every call site of a client. The limiter and
/// quota total are shared state; the rest is fixed at construction.
///
/// Steps per call:
///
/// 1. resolve the token (failure aborts before any network activity),
/// 2. build the URL, adding `as_user_id` when masquerading,
/// 3. in dry-run mode, render the request and return a synthetic `200` with `[]`,
/// 4. otherwise wait for a rate-limit permit and run the attempt under the retry policy,
/// 5. after each response, adapt the rate to `X-Rate-Limit-Remaining`,
/// 6. classify a final status >= 400 into an [`ApiError`](lectern_error::ApiError).
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    credential: Credential,
    renderer: Arc<dyn DryRunRenderer>,
    limiter: AdaptiveRateLimiter,
    retry: RetryPolicy,
    quota: QuotaDetector,
    quota_total: Arc<RwLock<f64>>,
    base_url: String,
    user_agent: String,
    as_user_id: Option<String>,
    dry_run: bool,
    show_token: bool,
}

impl RequestExecutor {
    /// Create an executor from client settings.
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>, credential: Credential) -> Self {
        Self {
            transport,
            credential,
            renderer: Arc::new(CurlRenderer),
            limiter: AdaptiveRateLimiter::new(),
            retry: config.retry_policy(),
            quota: QuotaDetector::new(),
            quota_total: Arc::new(RwLock::new(*config.rate_limit_total())),
            base_url: config.normalized_base_url().to_string(),
            user_agent: config.user_agent().clone(),
            as_user_id: config.as_user_id().clone(),
            dry_run: *config.dry_run(),
            show_token: *config.show_token(),
        }
    }

    /// Replace the dry-run renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn DryRunRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Share an existing limiter.
    pub fn with_limiter(mut self, limiter: AdaptiveRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// The limiter this executor throttles through.
    pub fn limiter(&self) -> &AdaptiveRateLimiter {
        &self.limiter
    }

    /// The retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Quota figures from the most recent response.
    pub fn quota(&self) -> &QuotaDetector {
        &self.quota
    }

    /// Base address without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Masquerade target, if any.
    pub fn as_user_id(&self) -> Option<&str> {
        self.as_user_id.as_deref()
    }

    /// Whether requests are rendered instead of sent.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Quota total used for rate adjustment.
    pub async fn rate_limit_total(&self) -> f64 {
        *self.quota_total.read().await
    }

    /// Change the quota total; non-positive or non-finite values are ignored.
    pub async fn set_rate_limit_total(&self, total: f64) {
        if !total.is_finite() || total <= 0.0 {
            warn!(total, "Ignoring invalid rate limit total");
            return;
        }
        *self.quota_total.write().await = total;
        debug!(total, "Rate limit total updated");
    }

    /// Absolute URL for `path`, with the masquerade parameter when configured.
    ///
    /// The base address and path are joined verbatim. `as_user_id` is only
    /// added when the path does not already carry it.
    pub fn build_url(&self, path: &str) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        if let Some(user) = &self.as_user_id {
            if !has_query_param(&url, MASQUERADE_PARAM) {
                url = append_query(&url, MASQUERADE_PARAM, user);
            }
        }
        url
    }

    /// Run one logical call.
    ///
    /// # Errors
    ///
    /// * [`CredentialError`] if no token can be obtained or it is not valid header text
    /// * [`CancelledError`] if `ctx` is cancelled or its deadline passes
    /// * [`HttpError`](lectern_error::HttpError) if every attempt failed in transport
    /// * [`ApiError`](lectern_error::ApiError) if the final status is >= 400
    #[instrument(skip(self, ctx, body), fields(method = %method, path = %path))]
    pub async fn execute(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> LecternResult<ApiResponse> {
        let token = self.credential.token().await?;
        let authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| CredentialError::new("Token contains characters not allowed in a header"))?;
        let url = self.build_url(path);

        let request = ApiRequest::new(method, url)
            .with_header_value(AUTHORIZATION, authorization)
            .with_header(CONTENT_TYPE, "application/json")
            .with_header(ACCEPT, "application/json")
            .with_header(USER_AGENT, &self.user_agent)
            .with_body(body);

        if self.dry_run {
            let command = self.renderer.render(&request, self.show_token);
            info!(%command, "Dry run, request not sent");
            return Ok(ApiResponse::new(200, HeaderMap::new(), b"[]".to_vec()));
        }

        self.limiter.wait(ctx).await?;

        let outcome = self.retry.execute(ctx, || self.attempt(&request)).await;
        let response = match outcome {
            Ok(response) | Err(AttemptFailure::Status(response)) => response,
            Err(AttemptFailure::Failed(e)) => return Err(e),
        };

        if response.status >= 400 {
            let err = classify_response(&response);
            warn!(status = response.status, message = %err.message(), "Request failed");
            return Err(err.into());
        }

        debug!(status = response.status, "Request succeeded");
        Ok(response)
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<ApiResponse, AttemptFailure> {
        let response = self
            .transport
            .send(request.clone())
            .await
            .map_err(AttemptFailure::Failed)?;

        if let Some(snapshot) = self.quota.detect(&response.headers).await {
            let total = self.rate_limit_total().await;
            self.limiter.adjust_rate(snapshot.remaining, total).await;
        }

        if self.retry.should_retry_status(response.status) {
            return Err(AttemptFailure::Status(response));
        }
        Ok(response)
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("credential", &self.credential)
            .field("retry", &self.retry)
            .field("as_user_id", &self.as_user_id)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Append `name=value` to the query of `url`, form-encoding the value.
pub(crate) fn append_query(url: &str, name: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    format!("{url}{separator}{name}={value}")
}

/// Whether `url` carries `name` as a query parameter.
pub(crate) fn has_query_param(url: &str, name: &str) -> bool {
    url.split_once('?').is_some_and(|(_, query)| {
        query
            .split('&')
            .any(|pair| pair.split('=').next() == Some(name))
    })
}
