use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::ListView;
use crate::error::RemoteFetchError;
use crate::fetch::FetchRequest;
use crate::infinite::SignalSender;
use crate::pagination::Paginator;
use crate::router::Route;
use crate::types::{AppEvent, CatalogItemDetail, CatalogItemSummary, CatalogPage, FeedEvent};

/// Rows from the end of the loaded feed at which the next page is requested.
const FEED_PREFETCH_ROWS: usize = 3;
const TOAST_TTL: Duration = Duration::from_secs(3);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Screen { List, Detail }

/// One query as the view sees it.
#[derive(Debug, Clone)]
pub struct Loadable<T> {
    pub data: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<RemoteFetchError>,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

impl<T> Loadable<T> {
    fn start(&mut self) {
        self.data = None;
        self.loading = true;
        self.error = None;
    }

    fn settle(&mut self, result: Result<Arc<T>, RemoteFetchError>) {
        self.loading = false;
        match result {
            Ok(v) => {
                self.data = Some(v);
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
    }
}

/// Mirror of the infinite feed, fed by `FeedEvent`s.
#[derive(Debug, Default)]
pub struct FeedView {
    pub items: Vec<CatalogItemSummary>,
    pub fetching: bool,
    pub exhausted: bool,
    pub error: Option<RemoteFetchError>,
}

pub struct App {
    quit: bool,
    fps: u32,
    view: ListView,
    screen: Screen,

    paginator: Paginator,
    page: Loadable<CatalogPage>,

    feed: FeedView,
    feed_epoch: u64,
    feed_signal: Option<SignalSender>,
    reload_requested: bool,

    sel: usize,
    list_viewport_rows: u16,

    detail_id: Option<String>,
    detail: Loadable<CatalogItemDetail>,

    fetch_tx: Option<UnboundedSender<FetchRequest>>,
    toast_message: Option<(String, Instant)>,
    spinner: usize,
}

impl App {
    pub fn new(
        fps: u32,
        page_limit: u32,
        view: ListView,
        fetch_tx: Option<UnboundedSender<FetchRequest>>,
    ) -> Self {
        Self {
            quit: false,
            fps,
            view,
            screen: Screen::List,
            paginator: Paginator::new(page_limit),
            page: Loadable::default(),
            feed: FeedView::default(),
            feed_epoch: 0,
            feed_signal: None,
            reload_requested: false,
            sel: 0,
            list_viewport_rows: 0,
            detail_id: None,
            detail: Loadable::default(),
            fetch_tx,
            toast_message: None,
            spinner: 0,
        }
    }

    pub fn fps(&self) -> u32 { self.fps }
    pub fn quit_flag(&self) -> bool { self.quit }
    pub fn quit(&mut self) { self.quit = true; }
    pub fn view(&self) -> ListView { self.view }
    pub fn screen(&self) -> Screen { self.screen }
    pub fn paginator(&self) -> &Paginator { &self.paginator }
    pub fn page(&self) -> &Loadable<CatalogPage> { &self.page }
    pub fn feed(&self) -> &FeedView { &self.feed }
    pub fn feed_epoch(&self) -> u64 { self.feed_epoch }
    pub fn detail_id(&self) -> Option<&str> { self.detail_id.as_deref() }
    pub fn detail(&self) -> &Loadable<CatalogItemDetail> { &self.detail }
    pub fn selection(&self) -> usize { self.sel }

    pub fn set_list_viewport_rows(&mut self, rows: u16) {
        self.list_viewport_rows = rows;
    }

    pub fn tick_spinner(&mut self) {
        self.spinner = self.spinner.wrapping_add(1);
    }

    pub fn spinner_frame(&self) -> char {
        const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
        FRAMES[(self.spinner / 4) % FRAMES.len()]
    }

    pub fn show_toast(&mut self, msg: String) {
        self.toast_message = Some((msg, Instant::now()));
    }

    pub fn toast_message(&self) -> Option<&str> {
        match &self.toast_message {
            Some((msg, at)) if at.elapsed() < TOAST_TTL => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Route of the current screen.
    pub fn route(&self) -> Route {
        match (&self.screen, &self.detail_id) {
            (Screen::Detail, Some(id)) => Route::detail(id.clone()),
            _ => Route::List,
        }
    }

    pub fn apply_route(&mut self, route: &Route) {
        match route {
            Route::List => self.back_to_list(),
            Route::Detail { id } => self.open_detail(id.clone()),
        }
    }

    /// Items of the active list view.
    pub fn list_items(&self) -> &[CatalogItemSummary] {
        match self.view {
            ListView::Pagination => self.page.data.as_ref().map(|p| p.items.as_slice()).unwrap_or(&[]),
            ListView::LoadMore => &self.feed.items,
        }
    }

    pub fn selected_item(&self) -> Option<&CatalogItemSummary> {
        self.list_items().get(self.sel)
    }

    fn send(&self, req: FetchRequest) {
        match &self.fetch_tx {
            Some(tx) => {
                if tx.send(req).is_err() {
                    log::warn!("[app] fetch worker is gone");
                }
            }
            None => log::debug!("[app] no fetch worker, dropped {req:?}"),
        }
    }

    // ===============================
    // Startup / feed wiring
    // ===============================

    /// Kick off the first query for the current screen.
    pub fn start(&mut self) {
        match self.screen {
            Screen::List => self.enter_view(),
            Screen::Detail => {}
        }
    }

    /// Called by the main loop whenever a fresh feed task was spawned.
    pub fn attach_feed(&mut self, epoch: u64, signal: SignalSender) {
        self.feed_epoch = epoch;
        self.feed_signal = Some(signal);
        self.feed = FeedView::default();
        if self.view == ListView::LoadMore && self.screen == Screen::List {
            self.sel = 0;
            self.signal_feed();
        }
    }

    /// True once after `reload`; the main loop then clears the caches,
    /// attaches a new feed and calls `finish_reload`.
    pub fn take_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    fn signal_feed(&mut self) {
        if self.feed.fetching || self.feed.exhausted {
            return;
        }
        if let Some(signal) = &self.feed_signal {
            if signal.notify() {
                self.feed.fetching = true;
            }
        }
    }

    fn maybe_prefetch_feed(&mut self) {
        if self.view != ListView::LoadMore || self.screen != Screen::List {
            return;
        }
        let len = self.feed.items.len();
        if len == 0 || self.sel + FEED_PREFETCH_ROWS >= len {
            self.signal_feed();
        }
    }

    // ===============================
    // Pagination view
    // ===============================

    fn request_page(&mut self, force: bool) {
        self.page.start();
        self.sel = 0;
        self.send(FetchRequest::Page { page: self.paginator.page(), force });
    }

    pub fn first_page(&mut self) {
        if self.paginator.first() { self.request_page(false); }
    }

    pub fn previous_page(&mut self) {
        if self.paginator.previous() { self.request_page(false); }
    }

    pub fn next_page(&mut self) {
        if self.paginator.next() { self.request_page(false); }
    }

    pub fn last_page(&mut self) {
        if self.paginator.last() { self.request_page(false); }
    }

    pub fn goto_page(&mut self, page: u32) {
        if self.paginator.goto(page) { self.request_page(false); }
    }

    // ===============================
    // Navigation
    // ===============================

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            ListView::Pagination => ListView::LoadMore,
            ListView::LoadMore => ListView::Pagination,
        };
        self.sel = 0;
        log::info!("[app] view -> {}", self.view);
        if self.screen == Screen::List {
            self.enter_view();
        }
    }

    fn enter_view(&mut self) {
        match self.view {
            ListView::Pagination => {
                if self.page.data.is_none() && !self.page.loading {
                    self.request_page(false);
                }
            }
            ListView::LoadMore => self.maybe_prefetch_feed(),
        }
    }

    pub fn up(&mut self) {
        self.sel = self.sel.saturating_sub(1);
    }

    pub fn down(&mut self) {
        let len = self.list_items().len();
        if len > 0 {
            self.sel = (self.sel + 1).min(len - 1);
        }
        self.maybe_prefetch_feed();
    }

    pub fn page_down(&mut self) {
        let len = self.list_items().len();
        let step = (self.list_viewport_rows as usize).max(1);
        if len > 0 {
            self.sel = (self.sel + step).min(len - 1);
        }
        self.maybe_prefetch_feed();
    }

    pub fn page_up(&mut self) {
        let step = (self.list_viewport_rows as usize).max(1);
        self.sel = self.sel.saturating_sub(step);
    }

    pub fn select_row(&mut self, idx: usize) {
        let len = self.list_items().len();
        if idx < len {
            self.sel = idx;
        }
        self.maybe_prefetch_feed();
    }

    pub fn open_selected(&mut self) {
        let Some(id) = self.selected_item().and_then(|it| it.id()).map(str::to_string) else {
            return;
        };
        self.open_detail(id);
    }

    pub fn open_detail(&mut self, id: String) {
        log::info!("[app] open /pokemon/{id}");
        self.screen = Screen::Detail;
        self.detail.start();
        self.detail_id = Some(id.clone());
        self.send(FetchRequest::Detail { id, force: false });
    }

    /// Leave the detail screen; a detail still in flight is discarded on arrival.
    pub fn back_to_list(&mut self) {
        self.screen = Screen::List;
        self.detail_id = None;
        self.detail = Loadable::default();
        self.enter_view();
    }

    /// Re-issue the query behind the visible error.
    pub fn retry(&mut self) {
        match self.screen {
            Screen::Detail => {
                if let Some(id) = self.detail_id.clone() {
                    self.detail.start();
                    self.send(FetchRequest::Detail { id, force: true });
                }
            }
            Screen::List => match self.view {
                ListView::Pagination => self.request_page(true),
                ListView::LoadMore => {
                    self.feed.error = None;
                    self.signal_feed();
                }
            },
        }
    }

    /// Drop all cached data and start over.
    pub fn reload(&mut self) {
        log::info!("[app] full reload");
        self.reload_requested = true;
        self.feed = FeedView::default();
        self.feed_signal = None;
        self.sel = 0;
        self.show_toast("Reloaded".to_string());
    }

    /// Re-issue the visible query once the caches are empty.
    pub fn finish_reload(&mut self) {
        match self.screen {
            Screen::List if self.view == ListView::Pagination => self.request_page(true),
            Screen::Detail => self.retry(),
            Screen::List => {}
        }
    }

    /// Re-issue the visible query if it is still showing a failure. A query
    /// whose success reported the reconnect has already been settled.
    fn retry_failed(&mut self) {
        let failed = match self.screen {
            Screen::Detail => self.detail.error.is_some(),
            Screen::List => match self.view {
                ListView::Pagination => self.page.error.is_some(),
                ListView::LoadMore => self.feed.error.is_some(),
            },
        };
        if failed {
            self.retry();
        } else if self.screen == Screen::List {
            self.maybe_prefetch_feed();
        }
    }

    // ===============================
    // Events
    // ===============================

    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::PageLoaded { page, result } => {
                if page != self.paginator.page() {
                    log::debug!("[app] discarding page {page}, showing {}", self.paginator.page());
                    return;
                }
                if let Ok(p) = &result {
                    if self.paginator.set_item_count(p.total_count) {
                        log::info!("[app] page {page} is past the end, showing {}", self.paginator.page());
                        self.request_page(false);
                        return;
                    }
                }
                self.page.settle(result);
                let len = self.list_items().len();
                if self.sel >= len {
                    self.sel = len.saturating_sub(1);
                }
            }
            AppEvent::DetailLoaded { id, result } => {
                if self.screen != Screen::Detail || self.detail_id.as_deref() != Some(id.as_str()) {
                    log::debug!("[app] discarding detail {id}");
                    return;
                }
                self.detail.settle(result);
            }
            AppEvent::Feed { epoch, event } => {
                if epoch != self.feed_epoch {
                    log::debug!("[app] discarding feed event from epoch {epoch}");
                    return;
                }
                self.on_feed_event(event);
            }
            AppEvent::Reconnected => {
                self.show_toast("Back online".to_string());
                self.retry_failed();
            }
        }
    }

    fn on_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Fetching { .. } => self.feed.fetching = true,
            FeedEvent::Appended { items, exhausted, .. } => {
                self.feed.items.extend(items);
                self.feed.fetching = false;
                self.feed.exhausted = exhausted;
                self.feed.error = None;
                // keep filling while the list does not reach past the viewport
                if self.feed.items.len() < self.list_viewport_rows as usize {
                    self.maybe_prefetch_feed();
                }
            }
            FeedEvent::Failed(e) => {
                self.feed.fetching = false;
                self.feed.error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infinite::{channel_signal, VisibilitySignal};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn items(range: std::ops::Range<u32>) -> Vec<CatalogItemSummary> {
        range
            .map(|i| CatalogItemSummary {
                name: format!("mon{i}"),
                detail_reference: format!("https://pokeapi.co/api/v2/pokemon/{i}/"),
            })
            .collect()
    }

    fn page(count: u64, range: std::ops::Range<u32>) -> Arc<CatalogPage> {
        Arc::new(CatalogPage {
            total_count: count,
            next_cursor: None,
            previous_cursor: None,
            items: items(range),
        })
    }

    fn app(view: ListView) -> (App, UnboundedReceiver<FetchRequest>) {
        let (tx, rx) = unbounded_channel();
        (App::new(30, 20, view, Some(tx)), rx)
    }

    #[test]
    fn start_requests_first_page() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        assert!(matches!(rx.try_recv(), Ok(FetchRequest::Page { page: 1, force: false })));
        assert!(app.page().loading);
    }

    #[test]
    fn page_result_sets_total_and_items() {
        let (mut app, _rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        assert_eq!(app.paginator().total(), 66);
        assert_eq!(app.list_items().len(), 20);
        assert!(!app.page().loading);
    }

    #[test]
    fn results_for_pages_no_longer_shown_are_discarded() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        app.next_page();
        while rx.try_recv().is_ok() {}
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        assert!(app.page().loading);
        assert!(app.page().data.is_none());
    }

    #[test]
    fn next_page_is_disabled_on_last_page() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(40, 1..21)) });
        while rx.try_recv().is_ok() {}
        app.next_page();
        assert!(matches!(rx.try_recv(), Ok(FetchRequest::Page { page: 2, .. })));
        app.on_event(AppEvent::PageLoaded { page: 2, result: Ok(page(40, 21..41)) });
        app.next_page();
        assert!(rx.try_recv().is_err());
        assert_eq!(app.paginator().page(), 2);
    }

    #[test]
    fn detail_opens_from_selection_and_late_results_are_dropped() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        while rx.try_recv().is_ok() {}
        app.down();
        app.open_selected();
        assert_eq!(app.route(), Route::detail("2"));
        match rx.try_recv() {
            Ok(FetchRequest::Detail { id, force }) => {
                assert_eq!(id, "2");
                assert!(!force);
            }
            other => panic!("unexpected {other:?}"),
        }

        app.back_to_list();
        app.on_event(AppEvent::DetailLoaded {
            id: "2".into(),
            result: Err(RemoteFetchError::item_not_found("2")),
        });
        assert_eq!(app.screen(), Screen::List);
        assert!(app.detail().error.is_none());
    }

    #[test]
    fn retry_refetches_the_failed_detail() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.apply_route(&Route::detail("9999"));
        while rx.try_recv().is_ok() {}
        app.on_event(AppEvent::DetailLoaded {
            id: "9999".into(),
            result: Err(RemoteFetchError::item_not_found("9999")),
        });
        assert_eq!(app.detail().error.as_ref().map(|e| e.message.as_str()), Some("item 9999 not found"));
        app.retry();
        assert!(matches!(rx.try_recv(), Ok(FetchRequest::Detail { force: true, .. })));
        assert!(app.detail().loading);
    }

    #[tokio::test]
    async fn load_more_signals_feed_near_the_end() {
        let (mut app, _rx) = app(ListView::LoadMore);
        let (tx, mut signal) = channel_signal();
        app.set_list_viewport_rows(5);
        app.attach_feed(1, tx);
        assert_eq!(signal.next_visible().await, Some(()));
        assert!(app.feed().fetching);

        app.on_event(AppEvent::Feed {
            epoch: 1,
            event: FeedEvent::Appended { items: items(1..21), total_loaded: 20, exhausted: false },
        });
        assert_eq!(app.list_items().len(), 20);

        for _ in 0..16 {
            app.down();
        }
        assert!(!app.feed().fetching);
        app.down();
        assert_eq!(app.selection(), 17);
        assert!(app.feed().fetching);
        assert_eq!(signal.next_visible().await, Some(()));
    }

    #[test]
    fn feed_events_from_an_old_epoch_are_ignored() {
        let (mut app, _rx) = app(ListView::LoadMore);
        let (tx, _signal) = channel_signal();
        app.attach_feed(2, tx);
        app.on_event(AppEvent::Feed {
            epoch: 1,
            event: FeedEvent::Appended { items: items(1..3), total_loaded: 2, exhausted: true },
        });
        assert!(app.feed().items.is_empty());
    }

    #[test]
    fn feed_failure_is_shown_and_retry_signals_again() {
        let (mut app, _rx) = app(ListView::LoadMore);
        let (tx, _signal) = channel_signal();
        app.attach_feed(1, tx);
        app.on_event(AppEvent::Feed {
            epoch: 1,
            event: FeedEvent::Failed(RemoteFetchError::new("failed to fetch item list (500)")),
        });
        assert!(app.feed().error.is_some());
        assert!(!app.feed().fetching);
        app.retry();
        assert!(app.feed().error.is_none());
        assert!(app.feed().fetching);
    }

    #[test]
    fn reload_hands_over_to_the_main_loop() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        while rx.try_recv().is_ok() {}

        app.reload();
        assert!(app.take_reload());
        assert!(!app.take_reload());
        assert!(rx.try_recv().is_err());

        app.finish_reload();
        assert!(matches!(rx.try_recv(), Ok(FetchRequest::Page { page: 1, force: true })));
        assert!(app.page().loading);
    }

    #[test]
    fn reconnect_leaves_a_settled_page_alone() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        while rx.try_recv().is_ok() {}

        app.on_event(AppEvent::Reconnected);
        assert!(rx.try_recv().is_err());
        assert_eq!(app.list_items().len(), 20);
        assert_eq!(app.toast_message(), Some("Back online"));
    }

    #[test]
    fn reconnect_retries_a_page_still_in_error() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded {
            page: 1,
            result: Err(RemoteFetchError::new("request failed: connection refused")),
        });
        while rx.try_recv().is_ok() {}

        app.on_event(AppEvent::Reconnected);
        assert!(matches!(rx.try_recv(), Ok(FetchRequest::Page { page: 1, force: true })));
    }

    #[test]
    fn page_past_a_shrunken_end_is_replaced() {
        let (mut app, mut rx) = app(ListView::Pagination);
        app.start();
        app.on_event(AppEvent::PageLoaded { page: 1, result: Ok(page(1302, 1..21)) });
        app.last_page();
        while rx.try_recv().is_ok() {}

        app.on_event(AppEvent::PageLoaded { page: 66, result: Ok(page(100, 0..0)) });
        assert_eq!(app.paginator().page(), 5);
        assert_eq!(app.paginator().status_line(), "Page 5 of 5 (20 On Each Page)");
        assert!(matches!(rx.try_recv(), Ok(FetchRequest::Page { page: 5, force: false })));
        assert!(app.page().loading);
    }
}
