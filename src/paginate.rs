//! Drain a cursor-paged listing into one `Vec`.

use std::future::Future;

use crate::error::DeployError;
use crate::types::Page;

/// Default cap on pages fetched for one listing.
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Call `fetch` with `None`, then with each continuation token it hands
/// back, until a page arrives without one.
///
/// Items are concatenated in call order. The first error aborts the whole
/// collection; partial results are dropped. A listing that is still
/// handing out tokens after `max_pages` calls fails closed. A cap of zero
/// is treated as one.
pub async fn collect_pages<T, F, Fut>(
    operation: &'static str,
    max_pages: usize,
    mut fetch: F,
) -> Result<Vec<T>, DeployError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, DeployError>>,
{
    let max_pages = max_pages.max(1);
    let mut items = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        if pages >= max_pages {
            tracing::warn!(operation, pages, "pagination did not terminate");
            return Err(DeployError::PaginationLimitExceeded { operation, pages });
        }

        let page = fetch(next_token.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    tracing::debug!(operation, pages, count = items.len(), "listing collected");
    Ok(items)
}
