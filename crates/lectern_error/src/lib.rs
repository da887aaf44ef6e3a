//! Error types for the Lectern REST client core.
//!
//! This crate provides the error types used throughout the Lectern workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*Error` structs carry the failure plus the source location where it was raised
//! - [`LecternErrorKind`] enumerates them, [`LecternError`] boxes the kind
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Programmatic branching on remote failures goes through the predicates in
//! [`classify`] (or the same-named methods on [`LecternError`]), never through
//! message matching.
//!
//! # Examples
//!
//! ```
//! use lectern_error::{ApiError, LecternResult, classify};
//!
//! fn fetch() -> LecternResult<String> {
//!     Err(ApiError::new(401, vec![]))?
//! }
//!
//! let err = fetch().unwrap_err();
//! assert!(classify::is_auth(&err));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod cancelled;
pub mod classify;
mod config;
mod credential;
mod error;
mod http;
mod json;
mod retry;
mod storage;

pub use api::{ApiError, ApiErrorDetail, RATE_LIMIT_DOCS_URL, suggestion_for};
pub use cancelled::{CancelReason, CancelledError};
pub use config::ConfigError;
pub use credential::CredentialError;
pub use error::{LecternError, LecternErrorKind, LecternResult};
pub use http::HttpError;
pub use json::JsonError;
pub use retry::{RetryableError, is_retryable_status};
pub use storage::{StorageError, StorageErrorKind};
