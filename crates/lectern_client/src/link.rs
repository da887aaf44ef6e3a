//! `Link` header decoding (RFC 5988).

use reqwest::header::{HeaderMap, LINK};

/// Pagination relations of one response. Empty strings mean absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// `rel="current"`
    pub current: String,
    /// `rel="next"`
    pub next: String,
    /// `rel="prev"`
    pub prev: String,
    /// `rel="first"`
    pub first: String,
    /// `rel="last"`
    pub last: String,
}

impl PaginationLinks {
    /// Decode a `Link` header value.
    ///
    /// Entries look like `<url>; rel="name"` and are separated by commas.
    /// Unknown relations and malformed entries are skipped, so an empty or
    /// unparsable header yields all-empty fields.
    ///
    /// # Example
    ///
    /// ```
    /// use lectern_client::PaginationLinks;
    ///
    /// let links = PaginationLinks::parse(
    ///     r#"<https://school.example/api/v1/courses?page=2>; rel="next""#,
    /// );
    /// assert!(links.has_next_page());
    /// assert!(!links.has_prev_page());
    /// ```
    pub fn parse(header: &str) -> Self {
        let mut links = Self::default();
        for entry in header.split(',') {
            let mut params = entry.split(';');
            let Some(url) = params.next().and_then(|target| {
                let target = target.trim();
                target.strip_prefix('<')?.strip_suffix('>')
            }) else {
                continue;
            };

            let rel = params.find_map(|param| {
                let (key, value) = param.split_once('=')?;
                (key.trim() == "rel").then(|| value.trim().trim_matches('"'))
            });

            let slot = match rel {
                Some("current") => &mut links.current,
                Some("next") => &mut links.next,
                Some("prev") => &mut links.prev,
                Some("first") => &mut links.first,
                Some("last") => &mut links.last,
                _ => continue,
            };
            *slot = url.to_string();
        }
        links
    }

    /// Decode the `Link` header of a response; absent means all empty.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Whether a next page exists.
    pub fn has_next_page(&self) -> bool {
        !self.next.is_empty()
    }

    /// Whether a previous page exists.
    pub fn has_prev_page(&self) -> bool {
        !self.prev.is_empty()
    }
}

/// Page number carried in a pagination URL.
///
/// Matches the first `page=` substring, which also occurs inside `per_page=`:
/// for `?per_page=10&page=3` this returns `10`. Callers that put `per_page`
/// first must not rely on it.
pub fn page_number(url: &str) -> Option<u32> {
    let start = url.find("page=")? + "page=".len();
    let digits: String = url[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
