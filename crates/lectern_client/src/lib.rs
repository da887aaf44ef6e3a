//! Request execution, pagination and the client facade.
//!
//! Every outbound call goes through one [`RequestExecutor`], which attaches the
//! bearer token, applies masquerading, honours dry-run mode, waits on the
//! adaptive rate limiter and retries transient failures. [`ApiClient`] layers
//! JSON helpers, the response cache, `Link`-header pagination and version
//! detection on top.
//!
//! # Example
//!
//! ```rust,ignore
//! use lectern_client::{ApiClient, ClientConfig, Credential};
//! use lectern_rate_limit::CallContext;
//!
//! let client = ApiClient::new(ClientConfig::load()?, Credential::fixed(token))?;
//! let ctx = CallContext::new();
//!
//! let course: Course = client.get_json(&ctx, "/api/v1/courses/1").await?;
//! let assignments: Vec<Assignment> = client.get_all(&ctx, "/api/v1/courses/1/assignments").await?;
//! if client.supports_feature(&ctx, "smart_search").await? {
//!     // ...
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod client;
mod config;
mod credential;
mod dry_run;
mod executor;
mod link;
mod pagination;
mod transport;

pub use classify::classify_response;
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{ClientConfig, ClientConfigBuilder, ClientConfigBuilderError};
pub use credential::{Credential, REDACTED, TokenProvider};
pub use dry_run::{CurlRenderer, DryRunRenderer};
pub use executor::{MASQUERADE_PARAM, RequestExecutor};
pub use link::{PaginationLinks, page_number};
pub use pagination::Paginator;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
