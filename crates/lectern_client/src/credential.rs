//! Access tokens.

use async_trait::async_trait;
use lectern_error::{CredentialError, LecternResult};
use std::fmt;
use std::sync::Arc;

/// Placeholder shown instead of a token.
pub const REDACTED: &str = "[REDACTED]";

/// A refreshable token source, consulted before every call.
///
/// May perform network I/O (token refresh).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token.
    async fn token(&self) -> LecternResult<String>;
}

/// Where the bearer token comes from.
#[derive(Clone)]
pub enum Credential {
    /// A token fixed at construction
    Static(String),
    /// A token obtained per call
    Provider(Arc<dyn TokenProvider>),
}

impl Credential {
    /// A fixed token.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// A refreshable provider.
    pub fn provider(provider: impl TokenProvider + 'static) -> Self {
        Self::Provider(Arc::new(provider))
    }

    /// Resolve the token for one call.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if the provider fails or the token is empty.
    pub async fn token(&self) -> LecternResult<String> {
        let token = match self {
            Self::Static(token) => token.clone(),
            Self::Provider(provider) => provider
                .token()
                .await
                .map_err(|e| CredentialError::new(format!("Token provider failed: {}", e)))?,
        };
        if token.trim().is_empty() {
            return Err(CredentialError::new("Access token is empty").into());
        }
        Ok(token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.debug_tuple("Static").field(&REDACTED).finish(),
            Self::Provider(_) => f.debug_tuple("Provider").finish_non_exhaustive(),
        }
    }
}
