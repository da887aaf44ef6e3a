//! Classification predicates over arbitrary error chains.
//!
//! Callers that hold a `Box<dyn Error>` or wrap [`LecternError`] in their own
//! types can still branch on the remote status. Each predicate walks the
//! `source()` chain looking for an [`ApiError`] and returns false when none is
//! found.

use crate::{ApiError, LecternError};
use std::error::Error;

/// Find the first [`ApiError`] in an error chain.
pub fn find_api_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a ApiError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(api) = e.downcast_ref::<ApiError>() {
            return Some(api);
        }
        if let Some(api) = e.downcast_ref::<LecternError>().and_then(LecternError::api_error) {
            return Some(api);
        }
        current = e.source();
    }
    None
}

/// Status 429 anywhere in the chain.
pub fn is_rate_limit(err: &(dyn Error + 'static)) -> bool {
    find_api_error(err).is_some_and(ApiError::is_rate_limit)
}

/// Status 401 anywhere in the chain.
pub fn is_auth(err: &(dyn Error + 'static)) -> bool {
    find_api_error(err).is_some_and(ApiError::is_auth)
}

/// Status 404 anywhere in the chain.
pub fn is_not_found(err: &(dyn Error + 'static)) -> bool {
    find_api_error(err).is_some_and(ApiError::is_not_found)
}

/// Status 403 anywhere in the chain.
pub fn is_forbidden(err: &(dyn Error + 'static)) -> bool {
    find_api_error(err).is_some_and(ApiError::is_forbidden)
}

/// 5xx status anywhere in the chain.
pub fn is_server_error(err: &(dyn Error + 'static)) -> bool {
    find_api_error(err).is_some_and(ApiError::is_server_error)
}
