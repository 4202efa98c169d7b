//! Cursor pagination over `nextPageToken`.

use std::future::Future;

use tracing::debug;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }
}

/// Fetches pages until one comes back without a continuation token and
/// returns all items in order. The first request carries no token; an empty
/// token counts as none.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page_token = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(page_token.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_page_token.filter(|token| !token.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!("Collected {} items over {} pages", items.len(), pages);
    Ok(items)
}
