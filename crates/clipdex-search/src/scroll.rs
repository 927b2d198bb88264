//! Full listing over a scroll cursor.
//!
//! A single search is capped at one page, so listing the whole index opens a
//! cursor and pages through it until a short (or empty) page signals the end.
//!
//! # States
//!
//! ```text
//! Unopened --next_page--> Paging --short page--> Exhausted --close--> Closed
//!                           |                                          ^
//!                           +------error-------> Failed -----close-----+
//! ```
//!
//! The cursor is released as soon as the walk ends, on [`ScrollWalker::close`],
//! and best-effort on drop. Release failures are only logged. A walker is not
//! restartable; walking again opens a fresh cursor.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clipdex_core::{Error, Result};
use futures::stream::{self, Stream};

use crate::document::ClipDocument;
use crate::dsl::{Query, SearchRequest, SearchResponse};
use crate::engine::SearchEngine;
use crate::query::QueryBuilder;
use crate::types::SortBy;

/// Where a walker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// No cursor opened yet.
    Unopened,
    /// A cursor is open and more pages may follow.
    Paging,
    /// The last page was short; every document has been produced.
    Exhausted,
    /// A page request failed; the walk cannot continue.
    Failed,
    /// Closed by the caller.
    Closed,
}

impl WalkState {
    /// Returns `true` if no further pages will be produced.
    pub fn is_finished(self) -> bool {
        !matches!(self, WalkState::Unopened | WalkState::Paging)
    }
}

/// Pages through every document, newest first.
pub struct ScrollWalker {
    engine: Arc<dyn SearchEngine>,
    index: String,
    request: SearchRequest,
    keep_alive: Duration,
    scroll_id: Option<String>,
    state: WalkState,
    pages: usize,
}

impl ScrollWalker {
    /// Walk `index` in pages of `page_size`, refreshing the cursor for
    /// `keep_alive` on every request.
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        index: impl Into<String>,
        page_size: usize,
        keep_alive: Duration,
    ) -> Self {
        Self {
            engine,
            index: index.into(),
            request: Self::listing_request(page_size),
            keep_alive,
            scroll_id: None,
            state: WalkState::Unopened,
            pages: 0,
        }
    }

    /// Request opening the listing cursor.
    pub fn listing_request(page_size: usize) -> SearchRequest {
        let mut request = SearchRequest::new(Query::MatchAll);
        request.sort = vec![QueryBuilder::sort(SortBy::CreatedAt)];
        request.size = page_size.max(1);
        request
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Number of page requests issued so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the walk has ended. On error the cursor is
    /// released and the walker moves to [`WalkState::Failed`].
    pub async fn next_page(&mut self) -> Result<Option<Vec<ClipDocument>>> {
        let response = match (self.state, self.scroll_id.clone()) {
            (WalkState::Unopened, _) => {
                self.state = WalkState::Paging;
                self.engine
                    .open_scroll(&self.index, &self.request, self.keep_alive)
                    .await
            }
            (WalkState::Paging, Some(scroll_id)) => {
                self.engine
                    .continue_scroll(&scroll_id, self.keep_alive)
                    .await
            }
            (WalkState::Paging, None) => Err(Error::scroll("engine returned no cursor id")),
            _ => return Ok(None),
        };
        self.pages += 1;

        match response.and_then(|r| self.decode(r)) {
            Ok(page) => {
                if page.len() < self.request.size {
                    log::debug!(
                        "Scroll over '{}' exhausted after {} page(s)",
                        self.index,
                        self.pages
                    );
                    self.state = WalkState::Exhausted;
                    self.release().await;
                }
                Ok((!page.is_empty()).then_some(page))
            }
            Err(e) => {
                log::warn!(
                    "Scroll over '{}' failed on page {}: {e}",
                    self.index,
                    self.pages
                );
                self.state = WalkState::Failed;
                self.release().await;
                Err(e)
            }
        }
    }

    fn decode(&mut self, response: SearchResponse) -> Result<Vec<ClipDocument>> {
        if let Some(scroll_id) = response.scroll_id {
            self.scroll_id = Some(scroll_id);
        }
        response
            .hits
            .into_iter()
            .map(|hit| ClipDocument::from_source(hit.source))
            .collect()
    }

    /// Release the cursor and stop walking.
    pub async fn close(&mut self) {
        self.release().await;
        self.state = WalkState::Closed;
    }

    async fn release(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };
        match self.engine.clear_scroll(&scroll_id).await {
            Ok(()) => log::debug!("Released scroll cursor over '{}'", self.index),
            Err(e) => log::warn!("Failed to release scroll cursor over '{}': {e}", self.index),
        }
    }

    /// Walk to the end, keeping whatever was fetched before any failure.
    pub async fn collect_all(mut self) -> Listing {
        let mut documents = Vec::new();
        let mut error = None;
        loop {
            match self.next_page().await {
                Ok(Some(page)) => documents.extend(page),
                Ok(None) => break,
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }
        self.close().await;

        if error.is_none() {
            log::info!(
                "Listed {} document(s) from '{}' in {} page(s)",
                documents.len(),
                self.index,
                self.pages
            );
        }
        Listing {
            documents,
            error,
            pages: self.pages,
        }
    }

    /// Documents as a stream; the cursor is released when it ends.
    ///
    /// A failure is yielded once as the final item.
    pub fn into_stream(self) -> impl Stream<Item = Result<ClipDocument>> + Send {
        stream::unfold(Some((self, VecDeque::new())), |state| async move {
            let (mut walker, mut buffer) = state?;
            loop {
                if let Some(doc) = buffer.pop_front() {
                    return Some((Ok(doc), Some((walker, buffer))));
                }
                match walker.next_page().await {
                    Ok(Some(page)) => buffer.extend(page),
                    Ok(None) => {
                        walker.close().await;
                        return None;
                    }
                    Err(e) => {
                        walker.close().await;
                        return Some((Err(e), None));
                    }
                }
            }
        })
    }
}

impl Drop for ScrollWalker {
    fn drop(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = Arc::clone(&self.engine);
                let index = self.index.clone();
                handle.spawn(async move {
                    if let Err(e) = engine.clear_scroll(&scroll_id).await {
                        log::warn!("Failed to release abandoned scroll over '{index}': {e}");
                    }
                });
            }
            Err(_) => log::warn!(
                "Scroll over '{}' abandoned outside a runtime; cursor left to expire",
                self.index
            ),
        }
    }
}

impl fmt::Debug for ScrollWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollWalker")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("pages", &self.pages)
            .field("page_size", &self.request.size)
            .finish()
    }
}

/// Outcome of a full listing.
#[derive(Debug, Default)]
pub struct Listing {
    /// Documents fetched, newest first.
    pub documents: Vec<ClipDocument>,
    /// Failure that cut the walk short, if any.
    pub error: Option<Error>,
    /// Page requests issued.
    pub pages: usize,
}

impl Listing {
    /// Returns `true` if the walk reached the end of the index.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// All documents, or the error if the walk was cut short.
    pub fn into_result(self) -> Result<Vec<ClipDocument>> {
        match self.error {
            None => Ok(self.documents),
            Some(e) => Err(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, Refresh};
    use chrono::{TimeZone, Utc};
    use futures::StreamExt;

    const KEEP_ALIVE: Duration = Duration::from_secs(300);

    async fn seeded(count: usize) -> Arc<MemoryEngine> {
        let engine = Arc::new(MemoryEngine::new());
        for i in 0..count {
            let doc = ClipDocument::builder()
                .id(format!("clip-{i}"))
                .name(format!("Clip {i}"))
                .created_at(Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap())
                .build();
            engine
                .index_document("clips", &doc.id, &doc.to_source().unwrap(), Refresh::Immediate)
                .await
                .unwrap();
        }
        engine
    }

    #[test]
    fn test_listing_request() {
        let body = ScrollWalker::listing_request(1000).to_json();
        assert_eq!(body["size"], 1000);
        assert_eq!(body["sort"][0]["createdAt"]["order"], "desc");
        assert!(body["query"]["match_all"].is_object());
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let engine = seeded(5).await;
        let mut walker = ScrollWalker::new(engine.clone(), "clips", 2, KEEP_ALIVE);
        assert_eq!(walker.state(), WalkState::Unopened);

        assert_eq!(walker.next_page().await.unwrap().unwrap().len(), 2);
        assert_eq!(walker.state(), WalkState::Paging);
        assert_eq!(walker.next_page().await.unwrap().unwrap().len(), 2);
        assert_eq!(walker.next_page().await.unwrap().unwrap().len(), 1);
        assert_eq!(walker.state(), WalkState::Exhausted);
        assert!(walker.next_page().await.unwrap().is_none());

        // Released on exhaustion, before close
        assert_eq!(engine.stats().live_scrolls, 0);
        walker.close().await;
        assert_eq!(walker.state(), WalkState::Closed);
        assert_eq!(walker.pages(), 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_empty_page() {
        let engine = seeded(4).await;
        let listing = ScrollWalker::new(engine.clone(), "clips", 2, KEEP_ALIVE)
            .collect_all()
            .await;
        assert!(listing.is_complete());
        assert_eq!(listing.documents.len(), 4);
        assert_eq!(listing.pages, 3);
        assert_eq!(engine.stats().scroll_clears, 1);
    }

    #[tokio::test]
    async fn test_newest_first() {
        let engine = seeded(3).await;
        let listing = ScrollWalker::new(engine, "clips", 10, KEEP_ALIVE)
            .collect_all()
            .await;
        let ids: Vec<&str> = listing.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["clip-2", "clip-1", "clip-0"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_results() {
        let engine = seeded(5).await;
        engine.fail_scroll_after(1);
        let listing = ScrollWalker::new(engine.clone(), "clips", 2, KEEP_ALIVE)
            .collect_all()
            .await;
        assert!(!listing.is_complete());
        assert_eq!(listing.documents.len(), 4);
        assert_eq!(engine.stats().live_scrolls, 0);
        assert!(listing.into_result().is_err());
    }

    #[tokio::test]
    async fn test_release_failure_is_not_fatal() {
        let engine = seeded(3).await;
        engine.fail_clear_scroll(true);
        let listing = ScrollWalker::new(engine, "clips", 10, KEEP_ALIVE)
            .collect_all()
            .await;
        assert!(listing.is_complete());
        assert_eq!(listing.documents.len(), 3);
    }

    #[tokio::test]
    async fn test_stream_yields_every_document() {
        let engine = seeded(7).await;
        let walker = ScrollWalker::new(engine.clone(), "clips", 3, KEEP_ALIVE);
        let docs: Vec<_> = walker.into_stream().collect().await;
        assert_eq!(docs.len(), 7);
        assert!(docs.iter().all(Result::is_ok));
        assert_eq!(engine.stats().live_scrolls, 0);
    }

    #[tokio::test]
    async fn test_drop_releases_cursor() {
        let engine = seeded(5).await;
        let mut walker = ScrollWalker::new(engine.clone(), "clips", 2, KEEP_ALIVE);
        walker.next_page().await.unwrap();
        assert_eq!(engine.stats().live_scrolls, 1);

        drop(walker);
        for _ in 0..10 {
            if engine.stats().live_scrolls == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(engine.stats().live_scrolls, 0);
    }

    #[tokio::test]
    async fn test_open_failure() {
        let engine = seeded(1).await;
        engine.set_unavailable(true);
        let mut walker = ScrollWalker::new(engine, "clips", 2, KEEP_ALIVE);
        assert!(walker.next_page().await.unwrap_err().is_unavailable());
        assert_eq!(walker.state(), WalkState::Failed);
        assert!(walker.state().is_finished());
        assert!(walker.next_page().await.unwrap().is_none());
    }
}
