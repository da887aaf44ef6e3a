//! Deterministic cache keys.
//!
//! A key is the hex SHA-256 digest of `base + path`, suffixed with
//! `":as_user:" + id` when the request masquerades as another user. Paginated
//! aggregates hash `base + "pages:" + path` so a full list never collides with
//! a single page of the same endpoint.

use sha2::{Digest, Sha256};

/// Namespace prefix for paginated aggregates.
pub const PAGES_NAMESPACE: &str = "pages:";

/// Key for a single-resource GET.
///
/// # Example
///
/// ```
/// use lectern_cache::resource_key;
///
/// let a = resource_key("https://school.example", "/api/v1/courses/1", None);
/// let b = resource_key("https://school.example", "/api/v1/courses/1", Some("42"));
/// assert_eq!(a.len(), 64);
/// assert_ne!(a, b);
/// ```
pub fn resource_key(base_url: &str, path: &str, as_user: Option<&str>) -> String {
    digest(base_url, path, as_user)
}

/// Key for the aggregated result of a paginated read.
pub fn pages_key(base_url: &str, path: &str, as_user: Option<&str>) -> String {
    digest(base_url, &format!("{PAGES_NAMESPACE}{path}"), as_user)
}

fn digest(base_url: &str, path: &str, as_user: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    hasher.update(path.as_bytes());
    if let Some(id) = as_user {
        hasher.update(b":as_user:");
        hasher.update(id.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://school.example";

    #[test]
    fn test_identical_inputs_identical_keys() {
        assert_eq!(
            resource_key(BASE, "/api/v1/courses", Some("7")),
            resource_key(BASE, "/api/v1/courses", Some("7"))
        );
    }

    #[test]
    fn test_masquerade_changes_key() {
        let plain = resource_key(BASE, "/api/v1/courses", None);
        let as_7 = resource_key(BASE, "/api/v1/courses", Some("7"));
        let as_8 = resource_key(BASE, "/api/v1/courses", Some("8"));
        assert_ne!(plain, as_7);
        assert_ne!(as_7, as_8);
    }

    #[test]
    fn test_base_and_path_change_key() {
        let key = resource_key(BASE, "/api/v1/courses", None);
        assert_ne!(key, resource_key("https://other.example", "/api/v1/courses", None));
        assert_ne!(key, resource_key(BASE, "/api/v1/courses/1", None));
    }

    #[test]
    fn test_pages_namespace_is_distinct() {
        assert_ne!(
            resource_key(BASE, "/api/v1/courses", None),
            pages_key(BASE, "/api/v1/courses", None)
        );
        assert_eq!(
            pages_key(BASE, "/api/v1/courses", None),
            resource_key(BASE, "pages:/api/v1/courses", None)
        );
    }
}
