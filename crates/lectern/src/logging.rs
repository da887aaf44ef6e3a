//! Structured logging setup.

use lectern_error::{ConfigError, LecternResult};
use std::env;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// How log output is filtered and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "lectern=debug")
    pub log_level: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json_logs: bool,
}

impl LogConfig {
    /// Configuration with the given fallback level and text output.
    pub fn new(log_level: impl Into<String>) -> Self {
        Self {
            log_level: log_level.into(),
            json_logs: false,
        }
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// The filter `init_logging` installs: `RUST_LOG` if set, else `log_level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if neither source is a valid directive.
    pub fn filter(&self) -> Result<EnvFilter, ConfigError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .map_err(|e| ConfigError::new(format!("Invalid log filter {:?}: {}", self.log_level, e)))
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
    }
}

/// Install a global `tracing` subscriber.
///
/// # Errors
///
/// Returns [`ConfigError`] for an invalid filter or if a global subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> LecternResult<()> {
    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::new(format!("Failed to install log subscriber: {}", e)))?;

    tracing::debug!(level = %config.log_level, json = config.json_logs, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_config_error() {
        // A RUST_LOG set in the environment would take precedence.
        if env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(LogConfig::new("lectern=[").filter().is_err());
        assert!(LogConfig::new("info,lectern_client=debug").filter().is_ok());
    }
}
