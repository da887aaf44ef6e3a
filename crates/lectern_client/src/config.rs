//! Client configuration.

use config::{Config, Environment, File};
use derive_getters::Getters;
use lectern_error::{ConfigError, LecternError, LecternResult};
use lectern_rate_limit::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Settings for one [`ApiClient`](crate::ApiClient).
///
/// Every field except `base_url` has a default, so a minimal TOML file is:
///
/// ```toml
/// base_url = "https://school.instructure.com"
/// ```
///
/// # Example
///
/// ```
/// use lectern_client::ClientConfigBuilder;
///
/// let config = ClientConfigBuilder::default()
///     .base_url("https://school.example")
///     .dry_run(true)
///     .build()
///     .unwrap();
/// assert_eq!(*config.rate_limit_total(), 700.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct ClientConfig {
    /// Base address, e.g. `https://school.instructure.com`
    base_url: String,

    /// `User-Agent` sent on every request
    #[serde(default = "default_user_agent")]
    #[builder(default = "default_user_agent()")]
    user_agent: String,

    /// Quota total the remaining figure is measured against
    #[serde(default = "default_rate_limit_total")]
    #[builder(default = "default_rate_limit_total()")]
    rate_limit_total: f64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    #[builder(default = "default_max_retries()")]
    max_retries: usize,

    /// Wait before the first retry (milliseconds)
    #[serde(default = "default_initial_backoff_ms")]
    #[builder(default = "default_initial_backoff_ms()")]
    initial_backoff_ms: u64,

    /// Upper bound for any retry wait (milliseconds)
    #[serde(default = "default_max_backoff_ms")]
    #[builder(default = "default_max_backoff_ms()")]
    max_backoff_ms: u64,

    /// Per-attempt request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    #[builder(default = "default_request_timeout_secs()")]
    request_timeout_secs: u64,

    /// Idle pooled connections close after this long (seconds)
    #[serde(default = "default_pool_idle_timeout_secs")]
    #[builder(default = "default_pool_idle_timeout_secs()")]
    pool_idle_timeout_secs: u64,

    /// `per_page` added to the first request of a paginated read
    #[serde(default = "default_per_page")]
    #[builder(default = "default_per_page()")]
    per_page: Option<u32>,

    /// Stop paginated reads after this many items
    #[serde(default)]
    #[builder(default)]
    max_results: Option<usize>,

    /// Act as this user (`as_user_id` query parameter)
    #[serde(default)]
    #[builder(default)]
    as_user_id: Option<String>,

    /// Render requests instead of sending them
    #[serde(default)]
    #[builder(default)]
    dry_run: bool,

    /// Show the bearer token in dry-run output
    #[serde(default)]
    #[builder(default)]
    show_token: bool,

    /// Whether reads go through the response cache
    #[serde(default = "default_cache_enabled")]
    #[builder(default = "default_cache_enabled()")]
    cache_enabled: bool,

    /// Path probed for the `X-Canvas-Meta` header
    #[serde(default = "default_version_probe_path")]
    #[builder(default = "default_version_probe_path()")]
    version_probe_path: String,
}

fn default_user_agent() -> String {
    format!("lectern/{}", env!("CARGO_PKG_VERSION"))
}

fn default_rate_limit_total() -> f64 {
    700.0
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_pool_idle_timeout_secs() -> u64 {
    90
}

fn default_per_page() -> Option<u32> {
    Some(100)
}

fn default_cache_enabled() -> bool {
    true
}

fn default_version_probe_path() -> String {
    "/api/v1/users/self".to_string()
}

impl ClientConfig {
    /// A configuration with defaults for everything but the base address.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: default_user_agent(),
            rate_limit_total: default_rate_limit_total(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            per_page: default_per_page(),
            max_results: None,
            as_user_id: None,
            dry_run: false,
            show_token: false,
            cache_enabled: default_cache_enabled(),
            version_probe_path: default_version_probe_path(),
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> LecternResult<Self> {
        debug!("Loading client configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                LecternError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| LecternError::from(ConfigError::new(format!("Failed to parse configuration: {}", e))))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir.
    ///
    /// 1. `~/.config/lectern/lectern.toml`
    /// 2. `./lectern.toml`
    /// 3. `LECTERN_*` environment variables (`LECTERN_BASE_URL`, `LECTERN_DRY_RUN`, ...)
    ///
    /// Files are optional; a base address must come from somewhere.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the sources cannot be merged or the result is invalid.
    #[instrument]
    pub fn load() -> LecternResult<Self> {
        debug!("Loading client configuration: env > current dir > home dir");

        let mut builder = Config::builder();

        if let Some(config_dir) = dirs::config_dir() {
            let home_config = config_dir.join("lectern").join("lectern.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("lectern").required(false))
            .add_source(Environment::with_prefix("LECTERN").try_parsing(true));

        let config: Self = builder
            .build()
            .map_err(|e| LecternError::from(ConfigError::new(format!("Failed to build configuration: {}", e))))?
            .try_deserialize()
            .map_err(|e| LecternError::from(ConfigError::new(format!("Failed to parse configuration: {}", e))))?;

        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise fail at request time.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a missing or non-HTTP base address, a
    /// non-positive quota total, or a backoff range that is upside down.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::new(format!("Invalid base_url {:?}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::new(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        if !self.rate_limit_total.is_finite() || self.rate_limit_total <= 0.0 {
            return Err(ConfigError::new("rate_limit_total must be a positive number"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::new("initial_backoff_ms must not exceed max_backoff_ms"));
        }
        if self.per_page == Some(0) {
            return Err(ConfigError::new("per_page must be at least 1"));
        }
        Ok(())
    }

    /// Base address without a trailing slash.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Retry policy built from the retry settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }

    /// Per-attempt request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pool idle timeout.
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}
