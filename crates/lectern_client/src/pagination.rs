//! Following `Link` headers across every page of a list endpoint.

use crate::executor::{append_query, has_query_param};
use crate::{PaginationLinks, RequestExecutor};
use lectern_error::{HttpError, JsonError, LecternResult};
use lectern_rate_limit::CallContext;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// Sequential page walker over a [`RequestExecutor`].
///
/// Items are delivered in server order. With a cap, exactly `max_results`
/// items are delivered and no page beyond the one that reached the cap is
/// requested.
///
/// # Example
///
/// ```rust,ignore
/// let courses: Vec<Course> = Paginator::new(&executor)
///     .with_per_page(Some(50))
///     .collect(&ctx, "/api/v1/courses")
///     .await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'a> {
    executor: &'a RequestExecutor,
    per_page: Option<u32>,
    max_results: Option<usize>,
}

impl<'a> Paginator<'a> {
    /// Walk pages through `executor`, uncapped and without a page-size hint.
    pub fn new(executor: &'a RequestExecutor) -> Self {
        Self {
            executor,
            per_page: None,
            max_results: None,
        }
    }

    /// Page-size hint added to the first request when the path has none.
    pub fn with_per_page(mut self, per_page: Option<u32>) -> Self {
        self.per_page = per_page;
        self
    }

    /// Stop after this many items.
    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Hand every item to `append`, in order. Returns the number delivered.
    ///
    /// # Errors
    ///
    /// Propagates executor failures, [`JsonError`] for a page body that is not
    /// a JSON array, [`HttpError`] for a `next` link that cannot be resolved,
    /// and any error returned by `append`.
    #[instrument(skip(self, ctx, append), fields(max_results = ?self.max_results))]
    pub async fn for_each<F>(&self, ctx: &CallContext, path: &str, mut append: F) -> LecternResult<usize>
    where
        F: FnMut(Value) -> LecternResult<()>,
    {
        if self.max_results == Some(0) {
            return Ok(0);
        }

        let mut next_path = self.first_path(path);
        let mut delivered = 0usize;
        let mut pages = 0usize;

        loop {
            let response = self.executor.execute(ctx, Method::GET, &next_path, None).await?;
            pages += 1;

            let items: Vec<Value> = serde_json::from_slice(&response.body).map_err(|e| {
                JsonError::new(format!("Page {} of {} is not a JSON array: {}", pages, path, e))
            })?;
            let room = self.max_results.map_or(usize::MAX, |cap| cap - delivered);
            for item in items.into_iter().take(room) {
                append(item)?;
                delivered += 1;
            }

            let links = PaginationLinks::from_headers(&response.headers);
            if !links.has_next_page() || self.max_results.is_some_and(|cap| delivered >= cap) {
                break;
            }
            next_path = request_path(self.executor.base_url(), &links.next)?;
        }

        debug!(pages, items = delivered, "Pagination finished");
        Ok(delivered)
    }

    /// Collect every item, decoded as `T`.
    ///
    /// # Errors
    ///
    /// As [`for_each`](Self::for_each), plus [`JsonError`] for an item that does
    /// not decode into `T`.
    pub async fn collect<T: DeserializeOwned>(&self, ctx: &CallContext, path: &str) -> LecternResult<Vec<T>> {
        let mut items = Vec::new();
        self.for_each(ctx, path, |value| {
            let item = serde_json::from_value(value)
                .map_err(|e| JsonError::new(format!("Failed to decode list item: {}", e)))?;
            items.push(item);
            Ok(())
        })
        .await?;
        Ok(items)
    }

    fn first_path(&self, path: &str) -> String {
        match self.per_page {
            Some(per_page) if !has_query_param(path, "per_page") => {
                append_query(path, "per_page", &per_page.to_string())
            }
            _ => path.to_string(),
        }
    }
}

/// Path and query of a `next` link, resolved against `base_url`.
///
/// Relative references are resolved; scheme, host and the base address's own
/// path prefix are dropped since the executor prepends the base again.
fn request_path(base_url: &str, link: &str) -> Result<String, HttpError> {
    let base = Url::parse(base_url)
        .map_err(|e| HttpError::new(format!("Invalid base address {}: {}", base_url, e)))?;
    let url = base
        .join(link)
        .map_err(|e| HttpError::new(format!("Unusable next link {}: {}", link, e)))?;

    let prefix = base.path().trim_end_matches('/');
    let path = url
        .path()
        .strip_prefix(prefix)
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(url.path());
    Ok(match url.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    })
}
