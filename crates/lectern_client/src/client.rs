//! The client facade resource mappers build on.

use crate::{
    ApiResponse, ClientConfig, Credential, DryRunRenderer, Paginator, ReqwestTransport,
    RequestExecutor, Transport,
};
use lectern_cache::{CacheStats, ResponseCache, pages_key, resource_key};
use lectern_error::{JsonError, LecternResult};
use lectern_rate_limit::{AdaptiveRateLimiter, CallContext};
use lectern_version::{MemoryVersionStore, RemoteVersion, VersionDetector, VersionStore};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, instrument, warn};

/// Resilient client for one remote service instance.
///
/// Cheap to clone; clones share the limiter, cache, quota total and detected
/// version.
///
/// # Example
///
/// ```rust,ignore
/// let config = ClientConfig::load()?;
/// let client = ApiClient::builder(config)
///     .with_credential(Credential::fixed(token))
///     .with_cache(Arc::new(MemoryCache::default()))
///     .build()?;
///
/// let ctx = CallContext::new();
/// let courses: Vec<Course> = client.get_all(&ctx, "/api/v1/courses").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    executor: RequestExecutor,
    cache: Option<Arc<dyn ResponseCache>>,
    cache_enabled: RwLock<bool>,
    detector: VersionDetector,
    version: OnceCell<RemoteVersion>,
}

impl std::fmt::Debug for ClientInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientInner")
            .field("executor", &self.executor)
            .field("has_cache", &self.cache.is_some())
            .field("version", &self.version.get())
            .finish_non_exhaustive()
    }
}

/// Assembles an [`ApiClient`] from its collaborators.
pub struct ApiClientBuilder {
    config: ClientConfig,
    credential: Option<Credential>,
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<dyn ResponseCache>>,
    version_store: Option<Arc<dyn VersionStore>>,
    renderer: Option<Arc<dyn DryRunRenderer>>,
    limiter: Option<AdaptiveRateLimiter>,
}

impl ApiClientBuilder {
    /// Token source. Required.
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Transport; defaults to [`ReqwestTransport`].
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Response cache; reads are uncached without one.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Version store; defaults to [`MemoryVersionStore`].
    pub fn with_version_store(mut self, store: Arc<dyn VersionStore>) -> Self {
        self.version_store = Some(store);
        self
    }

    /// Dry-run renderer; defaults to [`CurlRenderer`](crate::CurlRenderer).
    pub fn with_renderer(mut self, renderer: Arc<dyn DryRunRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Share a limiter with other clients of the same account.
    pub fn with_limiter(mut self, limiter: AdaptiveRateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](lectern_error::ConfigError) for an invalid
    /// configuration or a missing credential, or
    /// [`HttpError`](lectern_error::HttpError) if the default transport cannot
    /// be built.
    pub fn build(self) -> LecternResult<ApiClient> {
        self.config.validate()?;
        let credential = self
            .credential
            .ok_or_else(|| lectern_error::ConfigError::new("A credential is required"))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(
                self.config.request_timeout(),
                self.config.pool_idle_timeout(),
            )?),
        };

        let mut executor = RequestExecutor::new(&self.config, transport, credential);
        if let Some(renderer) = self.renderer {
            executor = executor.with_renderer(renderer);
        }
        if let Some(limiter) = self.limiter {
            executor = executor.with_limiter(limiter);
        }

        let store = self
            .version_store
            .unwrap_or_else(|| Arc::new(MemoryVersionStore::new()));

        info!(
            base_url = %executor.base_url(),
            dry_run = executor.is_dry_run(),
            cache = self.cache.is_some(),
            "Created API client"
        );

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                cache_enabled: RwLock::new(*self.config.cache_enabled()),
                config: self.config,
                executor,
                cache: self.cache,
                detector: VersionDetector::new(store),
                version: OnceCell::new(),
            }),
        })
    }
}

impl ApiClient {
    /// Start building a client.
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            credential: None,
            transport: None,
            cache: None,
            version_store: None,
            renderer: None,
            limiter: None,
        }
    }

    /// A client with the default transport, no cache and an in-memory version store.
    ///
    /// # Errors
    ///
    /// As [`ApiClientBuilder::build`].
    pub fn new(config: ClientConfig, credential: Credential) -> LecternResult<Self> {
        Self::builder(config).with_credential(credential).build()
    }

    /// Settings the client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The shared executor.
    pub fn executor(&self) -> &RequestExecutor {
        &self.inner.executor
    }

    /// The shared limiter.
    pub fn limiter(&self) -> &AdaptiveRateLimiter {
        self.inner.executor.limiter()
    }

    // ---- raw verbs -------------------------------------------------------

    /// Send a request and return the raw response.
    ///
    /// # Errors
    ///
    /// As [`RequestExecutor::execute`].
    pub async fn request(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> LecternResult<ApiResponse> {
        self.inner.executor.execute(ctx, method, path, body).await
    }

    /// `GET` a path.
    pub async fn get(&self, ctx: &CallContext, path: &str) -> LecternResult<ApiResponse> {
        self.request(ctx, Method::GET, path, None).await
    }

    /// `POST` a body.
    pub async fn post(&self, ctx: &CallContext, path: &str, body: Vec<u8>) -> LecternResult<ApiResponse> {
        self.request(ctx, Method::POST, path, Some(body)).await
    }

    /// `PUT` a body.
    pub async fn put(&self, ctx: &CallContext, path: &str, body: Vec<u8>) -> LecternResult<ApiResponse> {
        self.request(ctx, Method::PUT, path, Some(body)).await
    }

    /// `PATCH` a body.
    pub async fn patch(&self, ctx: &CallContext, path: &str, body: Vec<u8>) -> LecternResult<ApiResponse> {
        self.request(ctx, Method::PATCH, path, Some(body)).await
    }

    /// `DELETE` a path.
    pub async fn delete(&self, ctx: &CallContext, path: &str) -> LecternResult<ApiResponse> {
        self.request(ctx, Method::DELETE, path, None).await
    }

    // ---- JSON ------------------------------------------------------------

    /// `GET` a single resource and decode it, consulting the response cache.
    ///
    /// A hit is served without any network activity. A miss stores the raw
    /// body after a successful call. Cache failures are logged and ignored.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get), plus [`JsonError`] if the body does not decode.
    #[instrument(skip(self, ctx))]
    pub async fn get_json<T: DeserializeOwned>(&self, ctx: &CallContext, path: &str) -> LecternResult<T> {
        let key = self.cache_key(resource_key, path);

        if let Some(body) = self.cache_lookup(&key).await {
            match decode(&body) {
                Ok(value) => return Ok(value),
                Err(e) => warn!(error = %e, "Discarding undecodable cache entry"),
            }
        }

        let response = self.get(ctx, path).await?;
        let value = response.json()?;
        self.cache_store(&key, response.body).await;
        Ok(value)
    }

    /// `POST` a JSON body and decode the response.
    pub async fn post_json<B, T>(&self, ctx: &CallContext, path: &str, body: &B) -> LecternResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ctx, Method::POST, path, Some(encode(body)?)).await
    }

    /// `PUT` a JSON body and decode the response.
    pub async fn put_json<B, T>(&self, ctx: &CallContext, path: &str, body: &B) -> LecternResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ctx, Method::PUT, path, Some(encode(body)?)).await
    }

    /// `PATCH` a JSON body and decode the response.
    pub async fn patch_json<B, T>(&self, ctx: &CallContext, path: &str, body: &B) -> LecternResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ctx, Method::PATCH, path, Some(encode(body)?)).await
    }

    /// `DELETE` a path and decode the response.
    pub async fn delete_json<T: DeserializeOwned>(&self, ctx: &CallContext, path: &str) -> LecternResult<T> {
        self.send_json(ctx, Method::DELETE, path, None).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> LecternResult<T> {
        self.request(ctx, method, path, body).await?.json()
    }

    // ---- pagination ------------------------------------------------------

    /// Every item of a list endpoint, decoded as `T`, in server order.
    ///
    /// Honours the configured page-size hint and result cap. Uncapped reads
    /// go through the response cache under the `pages:` namespace.
    ///
    /// # Errors
    ///
    /// Propagates the first failing page, and [`JsonError`] for undecodable items.
    pub async fn get_all<T: DeserializeOwned>(&self, ctx: &CallContext, path: &str) -> LecternResult<Vec<T>> {
        self.get_all_capped(ctx, path, *self.inner.config.max_results()).await
    }

    /// As [`get_all`](Self::get_all) with an explicit cap, overriding the configured one.
    pub async fn get_all_limited<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        max_results: usize,
    ) -> LecternResult<Vec<T>> {
        self.get_all_capped(ctx, path, Some(max_results)).await
    }

    /// Every item of a list endpoint, handed to `append` in server order.
    ///
    /// Delivers the same items as [`get_all`](Self::get_all) without
    /// committing to an element type. Returns the number of items delivered.
    ///
    /// # Errors
    ///
    /// As [`get_all`](Self::get_all), plus any error returned by `append`.
    pub async fn get_all_with<F>(&self, ctx: &CallContext, path: &str, append: F) -> LecternResult<usize>
    where
        F: FnMut(Value) -> LecternResult<()>,
    {
        self.walk(ctx, path, *self.inner.config.max_results(), append).await
    }

    async fn get_all_capped<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        max_results: Option<usize>,
    ) -> LecternResult<Vec<T>> {
        let mut items = Vec::new();
        self.walk(ctx, path, max_results, |value| {
            let item = serde_json::from_value(value)
                .map_err(|e| JsonError::new(format!("Failed to decode list item: {}", e)))?;
            items.push(item);
            Ok(())
        })
        .await?;
        Ok(items)
    }

    #[instrument(skip(self, ctx, append))]
    async fn walk<F>(
        &self,
        ctx: &CallContext,
        path: &str,
        max_results: Option<usize>,
        mut append: F,
    ) -> LecternResult<usize>
    where
        F: FnMut(Value) -> LecternResult<()>,
    {
        let paginator = Paginator::new(&self.inner.executor)
            .with_per_page(*self.inner.config.per_page())
            .with_max_results(max_results);

        if max_results.is_some() {
            return paginator.for_each(ctx, path, append).await;
        }

        let key = self.cache_key(pages_key, path);
        if let Some(body) = self.cache_lookup(&key).await {
            match decode::<Vec<Value>>(&body) {
                Ok(values) => {
                    debug!(items = values.len(), "Serving paginated read from cache");
                    let count = values.len();
                    for value in values {
                        append(value)?;
                    }
                    return Ok(count);
                }
                Err(e) => warn!(error = %e, "Discarding undecodable cache entry"),
            }
        }

        let mut collected = Vec::new();
        let count = paginator
            .for_each(ctx, path, |value| {
                collected.push(value.clone());
                append(value)
            })
            .await?;

        match serde_json::to_vec(&collected) {
            Ok(body) => self.cache_store(&key, body).await,
            Err(e) => warn!(error = %e, "Failed to encode paginated result for cache"),
        }
        Ok(count)
    }

    // ---- version ---------------------------------------------------------

    /// The remote release version, detected on first use.
    ///
    /// Detection probes the configured path once per client and persists the
    /// result in the version store. In dry-run mode nothing is probed and the
    /// unknown placeholder is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CancelledError`](lectern_error::CancelledError) when `ctx` is
    /// cancelled during detection. Nothing is remembered then, and the next
    /// call probes again.
    pub async fn version(&self, ctx: &CallContext) -> LecternResult<RemoteVersion> {
        let version = self
            .inner
            .version
            .get_or_try_init(|| async {
                if self.inner.executor.is_dry_run() {
                    debug!("Dry run, skipping version detection");
                    return Ok(RemoteVersion::unknown());
                }
                let probe_path = self.inner.config.version_probe_path().as_str();
                self.inner
                    .detector
                    .resolve(self.inner.executor.base_url(), || async move {
                        self.get(ctx, probe_path).await.map(|response| response.headers)
                    })
                    .await
            })
            .await?;
        Ok(version.clone())
    }

    /// Whether the remote version is at or above `(major, minor, patch)`.
    ///
    /// # Errors
    ///
    /// As [`version`](Self::version).
    pub async fn is_at_least(
        &self,
        ctx: &CallContext,
        major: u32,
        minor: u32,
        patch: u32,
    ) -> LecternResult<bool> {
        Ok(self.version(ctx).await?.is_at_least(major, minor, patch))
    }

    /// Whether the remote version supports a gated feature.
    ///
    /// # Errors
    ///
    /// As [`version`](Self::version).
    pub async fn supports_feature(&self, ctx: &CallContext, feature: &str) -> LecternResult<bool> {
        Ok(self.version(ctx).await?.supports_feature(feature))
    }

    // ---- runtime settings ------------------------------------------------

    /// Change the quota total used for rate adjustment.
    pub async fn set_rate_limit_total(&self, total: f64) {
        self.inner.executor.set_rate_limit_total(total).await;
    }

    /// Quota total used for rate adjustment.
    pub async fn rate_limit_total(&self) -> f64 {
        self.inner.executor.rate_limit_total().await
    }

    /// Turn response caching on or off.
    pub async fn set_cache_enabled(&self, enabled: bool) {
        *self.inner.cache_enabled.write().await = enabled;
        debug!(enabled, "Response cache toggled");
    }

    /// Whether reads currently go through the cache.
    pub async fn cache_enabled(&self) -> bool {
        self.inner.cache.is_some() && *self.inner.cache_enabled.read().await
    }

    /// Drop every cached response.
    ///
    /// # Errors
    ///
    /// Propagates the cache's failure; a client without a cache always succeeds.
    pub async fn clear_cache(&self) -> LecternResult<()> {
        match &self.inner.cache {
            Some(cache) => cache.clear().await,
            None => Ok(()),
        }
    }

    /// Counters of the response cache, if the client has one.
    ///
    /// # Errors
    ///
    /// Propagates the cache's failure.
    pub async fn cache_stats(&self) -> LecternResult<Option<CacheStats>> {
        match &self.inner.cache {
            Some(cache) => Ok(Some(cache.stats().await?)),
            None => Ok(None),
        }
    }

    // ---- cache plumbing --------------------------------------------------

    fn cache_key(&self, key_fn: fn(&str, &str, Option<&str>) -> String, path: &str) -> String {
        let executor = &self.inner.executor;
        key_fn(executor.base_url(), path, executor.as_user_id())
    }

    async fn cache_lookup(&self, key: &str) -> Option<Vec<u8>> {
        let cache = self.active_cache().await?;
        match cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "Cache lookup failed, continuing without cache");
                None
            }
        }
    }

    async fn cache_store(&self, key: &str, body: Vec<u8>) {
        let Some(cache) = self.active_cache().await else {
            return;
        };
        if let Err(e) = cache.set(key, body).await {
            warn!(error = %e, "Cache store failed, continuing without cache");
        }
    }

    async fn active_cache(&self) -> Option<&Arc<dyn ResponseCache>> {
        if self.inner.executor.is_dry_run() || !*self.inner.cache_enabled.read().await {
            return None;
        }
        self.inner.cache.as_ref()
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, JsonError> {
    serde_json::from_slice(body).map_err(|e| JsonError::new(format!("Failed to decode cached body: {}", e)))
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, JsonError> {
    serde_json::to_vec(body).map_err(|e| JsonError::new(format!("Failed to encode request body: {}", e)))
}
