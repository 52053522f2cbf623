//! # Cursor Pagination
//!
//! Both remote reads (list items, search results) are cursor-paginated
//! collections. [`Paginator`] walks one of them forward, a page at a time,
//! starting from the beginning and stopping at the first page that carries
//! no cursor.
//!
//! A fetch error is returned to the caller as-is. Items from earlier pages
//! have already been handed out by then; the walk never rewinds, and a new
//! walk always starts from the first page.

use std::future::Future;

use crate::identity::{Cursor, Page};

/// Items requested per page. The largest page size the service accepts.
pub const PAGE_SIZE: u32 = 100;

/// Forward-only walk over a cursor-paginated collection.
///
/// `fetch` is called with `None` for the first page and with the previous
/// page's cursor afterwards.
pub struct Paginator<F> {
    fetch: F,
    cursor: Option<Cursor>,
    exhausted: bool,
    pages: usize,
}

impl<F> Paginator<F> {
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            cursor: None,
            exhausted: false,
            pages: 0,
        }
    }

    /// Number of pages fetched successfully so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the collection is exhausted; every later call
    /// also returns `Ok(None)` without touching the remote side.
    pub async fn next_page<T, E, Fut>(&mut self) -> Result<Option<Vec<T>>, E>
    where
        F: FnMut(Option<Cursor>) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        if self.exhausted {
            return Ok(None);
        }

        let page = (self.fetch)(self.cursor.clone()).await?;
        self.pages += 1;

        tracing::debug!(
            page = self.pages,
            items = page.items.len(),
            more = page.cursor.is_some(),
            "fetched page"
        );

        match page.cursor {
            Some(next) => self.cursor = Some(next),
            None => {
                self.cursor = None;
                self.exhausted = true;
            }
        }

        Ok(Some(page.items))
    }
}

/// Drain a paginated collection into `consumer`, returning the number of
/// items visited.
pub async fn for_each_item<T, E, F, Fut>(fetch: F, mut consumer: impl FnMut(T)) -> Result<usize, E>
where
    F: FnMut(Option<Cursor>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut paginator = Paginator::new(fetch);
    let mut visited = 0;
    while let Some(items) = paginator.next_page().await? {
        for item in items {
            visited += 1;
            consumer(item);
        }
    }
    Ok(visited)
}
