//! Infinite-scroll bookkeeping.
//!
//! [`InfiniteScroll`] tracks one continuation cursor (an offset into the
//! remote list) and the items gathered so far. Each page's `next` link
//! yields the following cursor; a page without one ends the feed.
//!
//! Scheduling lives elsewhere: a [`VisibilitySignal`] reports that the end of
//! the list came into view and [`InfiniteFeed`] turns each report into at most
//! one page fetch. Only one fetch is ever outstanding, so pages are appended
//! in request order.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc::{
    unbounded_channel, UnboundedReceiver, UnboundedSender, WeakUnboundedSender,
};

use crate::client::QueryClient;
use crate::error::{RemoteFetchError, Result};
use crate::types::{CatalogItemSummary, CatalogPage, FeedEvent};

/// Numeric `offset` parameter of a continuation link: the digits following
/// the first `offset=` that has any, whatever trails them
/// (`...?offset=20abc&limit=20` gives 20).
pub fn cursor_from_next(link: &str) -> Option<u32> {
    let mut rest = link;
    while let Some(pos) = rest.find("offset=") {
        rest = &rest[pos + "offset=".len()..];
        let digits: &str = &rest[..rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len())];
        if let Ok(n) = digits.parse() {
            return Some(n);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    Idle,
    Fetching,
    /// No further pages; requests are refused until `reset`.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct InfiniteScroll {
    items: Vec<CatalogItemSummary>,
    pages_loaded: usize,
    cursor: Option<u32>,
    fetching: bool,
    last_error: Option<RemoteFetchError>,
}

impl Default for InfiniteScroll {
    fn default() -> Self {
        Self::new()
    }
}

impl InfiniteScroll {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            pages_loaded: 0,
            cursor: Some(0),
            fetching: false,
            last_error: None,
        }
    }

    /// Back to the initial state (full reload).
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn items(&self) -> &[CatalogItemSummary] { &self.items }
    pub fn pages_loaded(&self) -> usize { self.pages_loaded }
    pub fn cursor(&self) -> Option<u32> { self.cursor }
    pub fn is_fetching(&self) -> bool { self.fetching }
    pub fn last_error(&self) -> Option<&RemoteFetchError> { self.last_error.as_ref() }

    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn phase(&self) -> ScrollPhase {
        if self.fetching {
            ScrollPhase::Fetching
        } else if self.cursor.is_none() {
            ScrollPhase::Exhausted
        } else {
            ScrollPhase::Idle
        }
    }

    /// Claim the next cursor. `None` while a fetch is outstanding or once exhausted.
    pub fn begin_fetch(&mut self) -> Option<u32> {
        if self.fetching {
            return None;
        }
        let cursor = self.cursor?;
        self.fetching = true;
        Some(cursor)
    }

    /// Append a fetched page and move the cursor to its `next` link.
    pub fn on_page(&mut self, page: &CatalogPage) {
        if self.cursor.is_none() {
            log::warn!("[infinite] page arrived after exhaustion, ignored");
            self.fetching = false;
            return;
        }
        self.fetching = false;
        self.last_error = None;
        self.items.extend(page.items.iter().cloned());
        self.pages_loaded += 1;
        self.cursor = page.next_cursor.as_deref().and_then(cursor_from_next);
        match self.cursor {
            Some(c) => log::debug!("[infinite] {} items, next cursor {c}", self.items.len()),
            None => log::info!("[infinite] exhausted after {} items", self.items.len()),
        }
    }

    /// A failed fetch leaves items and cursor untouched; the same cursor is tried again.
    pub fn on_error(&mut self, err: RemoteFetchError) {
        self.fetching = false;
        self.last_error = Some(err);
    }
}

/// Tells the feed that the end of the list is visible.
#[async_trait]
pub trait VisibilitySignal: Send {
    /// Resolves on the next "visible" report; `None` once the source is gone.
    async fn next_visible(&mut self) -> Option<()>;
}

/// Sending half of [`ChannelSignal`].
#[derive(Clone, Debug)]
pub struct SignalSender(UnboundedSender<()>);

impl SignalSender {
    /// Report the sentinel as visible. Returns false when the feed is gone.
    pub fn notify(&self) -> bool {
        self.0.send(()).is_ok()
    }

    /// A handle that does not keep the signal source open.
    pub fn downgrade(&self) -> WeakSignalSender {
        WeakSignalSender(self.0.downgrade())
    }
}

/// Non-owning [`SignalSender`]; the feed ends once every strong sender is gone.
#[derive(Clone, Debug)]
pub struct WeakSignalSender(WeakUnboundedSender<()>);

impl WeakSignalSender {
    pub fn notify(&self) -> bool {
        self.0.upgrade().is_some_and(|tx| tx.send(()).is_ok())
    }
}

pub struct ChannelSignal(UnboundedReceiver<()>);

pub fn channel_signal() -> (SignalSender, ChannelSignal) {
    let (tx, rx) = unbounded_channel();
    (SignalSender(tx), ChannelSignal(rx))
}

#[async_trait]
impl VisibilitySignal for ChannelSignal {
    async fn next_visible(&mut self) -> Option<()> {
        self.0.recv().await
    }
}

/// Drives an [`InfiniteScroll`] from a visibility signal through the query client.
pub struct InfiniteFeed {
    client: QueryClient,
    scroll: InfiniteScroll,
}

impl InfiniteFeed {
    pub fn new(client: QueryClient) -> Self {
        Self {
            client,
            scroll: InfiniteScroll::new(),
        }
    }

    pub fn scroll(&self) -> &InfiniteScroll {
        &self.scroll
    }

    pub fn reset(&mut self) {
        self.scroll.reset();
    }

    async fn fetch(&self, cursor: u32) -> Result<Arc<CatalogPage>> {
        self.client.infinite_page(cursor).await
    }

    fn apply(&mut self, result: Result<Arc<CatalogPage>>) -> FeedEvent {
        match result {
            Ok(page) => {
                self.scroll.on_page(&page);
                FeedEvent::Appended {
                    items: page.items.clone(),
                    total_loaded: self.scroll.items().len(),
                    exhausted: !self.scroll.has_next(),
                }
            }
            Err(e) => {
                log::warn!("[infinite] fetch at cursor {:?} failed: {e}", self.scroll.cursor());
                self.scroll.on_error(e.clone());
                FeedEvent::Failed(e)
            }
        }
    }

    /// Fetch the next page if one may be requested now.
    pub async fn load_next(&mut self) -> Option<FeedEvent> {
        let cursor = self.scroll.begin_fetch()?;
        let result = self.fetch(cursor).await;
        Some(self.apply(result))
    }

    /// Serve visibility reports until the signal source closes. Reports that
    /// arrive while exhausted are ignored.
    pub async fn run<S, E>(&mut self, mut signal: S, mut emit: E)
    where
        S: VisibilitySignal,
        E: FnMut(FeedEvent) + Send,
    {
        while signal.next_visible().await.is_some() {
            let Some(cursor) = self.scroll.begin_fetch() else {
                log::debug!("[infinite] visible, nothing to fetch ({:?})", self.scroll.phase());
                continue;
            };
            emit(FeedEvent::Fetching { cursor });
            let result = self.fetch(cursor).await;
            emit(self.apply(result));
        }
        log::debug!("[infinite] signal closed");
    }
}
