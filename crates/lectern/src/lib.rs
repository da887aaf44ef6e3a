//! Lectern: a resilient client core for rate-limited, versioned LMS REST APIs.
//!
//! Resource mappers (courses, assignments, pages, quizzes...) are built on the
//! primitives re-exported here:
//!
//! - **Verb calls** returning raw responses, and JSON helpers on top
//! - **Pagination** following `Link` headers, typed or element by element
//! - **Adaptive rate limiting** driven by `X-Rate-Limit-Remaining`
//! - **Retry** with bounded exponential backoff, cancellable through [`CallContext`]
//! - **Response caching** through an injected [`ResponseCache`]
//! - **Version detection** with a persisted cache and a feature gate
//! - **Structured errors** with status predicates and remediation hints
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lectern::{ApiClient, CallContext, ClientConfig, Credential, LogConfig, init_logging};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LogConfig::default())?;
//!
//!     let config = ClientConfig::load()?;
//!     let client = ApiClient::new(config, Credential::fixed(std::env::var("LMS_TOKEN")?))?;
//!
//!     let ctx = CallContext::new();
//!     let courses: Vec<serde_json::Value> = client.get_all(&ctx, "/api/v1/courses").await?;
//!     println!("{} courses", courses.len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `lectern_error` - Error types and classification predicates
//! - `lectern_rate_limit` - Adaptive limiter, retry policy, call context
//! - `lectern_cache` - Response cache capability, in-memory cache, cache keys
//! - `lectern_version` - Version detection, version stores, feature gate
//! - `lectern_client` - Executor, pagination, transport and the client facade
//!
//! This crate re-exports everything for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;

pub use lectern_cache::*;
pub use lectern_client::*;
pub use lectern_error::*;
pub use lectern_rate_limit::*;
pub use lectern_version::*;
pub use logging::{LogConfig, init_logging};
