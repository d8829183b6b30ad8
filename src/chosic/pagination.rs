//! Offset pagination with a fixed pause between requests.
//!
//! The upstream sits behind an edge proxy that blocks clients issuing
//! requests back to back, so every page after the first waits for
//! [`PAGE_DELAY`] after the previous response. The pause is not optional.
//!
//! The limiter uses `tokio::time`, which lets tests drive it with a paused
//! clock instead of sleeping for real.

use std::{future::Future, time::Duration};

use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::{error::ApiError, error::PaginationError, utils::MAX_PER_REQUEST};

/// Pause between two page requests.
pub const PAGE_DELAY: Duration = Duration::from_millis(500);

/// Enforces a minimum interval between the end of one request and the start
/// of the next.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_completed: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_completed: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the next request may start. Returns immediately before the
    /// first request.
    pub async fn until_ready(&self) {
        if let Some(last) = self.last_completed {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                debug!(delay = ?(ready_at - Instant::now()), "waiting before next request");
                sleep_until(ready_at).await;
            }
        }
    }

    /// Records that a request has just completed.
    pub fn mark_completed(&mut self) {
        self.last_completed = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(PAGE_DELAY)
    }
}

/// Position of a single page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// One-based page number, for endpoints that page by number instead of
    /// offset.
    pub fn page_number(&self) -> usize {
        self.offset / self.page_size.max(1) + 1
    }
}

/// One round trip worth of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<usize>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: Option<usize>) -> Self {
        Self { items, total }
    }
}

/// Items gathered across all pages, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub total: Option<usize>,
}

/// Clamps a requested page size into the range the API accepts.
pub fn clamp_page_size(page_size: u32) -> usize {
    page_size.clamp(1, MAX_PER_REQUEST) as usize
}

/// Drives an offset-paginated listing until the limit, the server total or
/// the end of the data is reached.
pub struct Paginator {
    page_size: usize,
    limiter: RateLimiter,
}

impl Paginator {
    /// `page_size` is clamped to `1..=100`. A page size of 1 is accepted but
    /// multiplies the number of round trips, and with it the total delay.
    pub fn new(page_size: u32, limiter: RateLimiter) -> Self {
        let page_size = clamp_page_size(page_size);
        if page_size == 1 {
            warn!("page size 1 issues one request per item; expect a slow fetch");
        }
        Self { page_size, limiter }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetches pages through `request_fn` until one of the stop conditions
    /// holds:
    ///
    /// - the page came back empty or shorter than the page size,
    /// - at least `limit` items have been collected,
    /// - the server-reported total has been covered.
    ///
    /// A `limit` of `None` or `Some(0)` fetches a single page and returns it
    /// untruncated. Otherwise the result is truncated to `limit`; a limit
    /// below the page size still requests a full page.
    ///
    /// The first failing page aborts the fetch; the error carries whatever
    /// was collected before it.
    pub async fn fetch_all<T, F, Fut>(
        &mut self,
        limit: Option<usize>,
        mut request_fn: F,
    ) -> Result<AggregatedResult<T>, PaginationError<T>>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, ApiError>>,
    {
        let limit = limit.filter(|l| *l > 0);
        let page_size = self.page_size;

        let mut offset = 0;
        let mut pages = 0;
        let mut total = None;
        let mut collected: Vec<T> = Vec::new();

        loop {
            self.limiter.until_ready().await;

            let request = PageRequest { offset, page_size };
            debug!(offset, page_size, "requesting page");

            let result = request_fn(request).await;
            self.limiter.mark_completed();
            pages += 1;

            let page = match result {
                Ok(page) => page,
                Err(source) => {
                    warn!(offset, error = %source, "page request failed, aborting");
                    return Err(PaginationError {
                        collected,
                        offset,
                        source,
                    });
                }
            };

            let received = page.items.len();
            if page.total.is_some() {
                total = page.total;
            }
            collected.extend(page.items);

            debug!(offset, received, collected = collected.len(), ?total, "page merged");

            let Some(limit) = limit else {
                break;
            };

            if received == 0 {
                debug!(offset, "empty page, stopping");
                break;
            }
            if collected.len() >= limit {
                break;
            }
            if total.is_some_and(|t| offset + page_size >= t) {
                debug!(?total, "server total reached");
                break;
            }
            if received < page_size {
                debug!(offset, received, "short page, stopping");
                break;
            }

            offset += page_size;
        }

        if let Some(limit) = limit {
            collected.truncate(limit);
        }

        info!(pages, items = collected.len(), "pagination finished");

        Ok(AggregatedResult {
            items: collected,
            pages,
            total,
        })
    }
}
