use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::client::QueryClient;
use crate::error::RemoteFetchError;
use crate::infinite::{channel_signal, InfiniteFeed, SignalSender};
use crate::types::{AppEvent, FeedEvent};

const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(2);
const MAX_RECHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Query requests from the app loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// `force` skips the freshness check (manual retry).
    Page { page: u32, force: bool },
    Detail { id: String, force: bool },
}

impl FetchRequest {
    pub fn is_forced(&self) -> bool {
        match self {
            FetchRequest::Page { force, .. } | FetchRequest::Detail { force, .. } => *force,
        }
    }
}

/// Shared online/offline state of the worker and the feed.
///
/// A result without an HTTP status means the request never got an answer.
/// While offline the failed query is re-run every `recheck_interval` (doubling,
/// capped at 30s); the first success afterwards is the reconnect.
#[derive(Clone, Debug)]
pub struct Connectivity {
    offline: Arc<AtomicBool>,
    recheck_interval: Duration,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(DEFAULT_RECHECK_INTERVAL)
    }
}

impl Connectivity {
    pub fn new(recheck_interval: Duration) -> Self {
        Self {
            offline: Arc::new(AtomicBool::new(false)),
            recheck_interval,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Record an outcome (`None` = success). Returns true when it ends an
    /// offline period.
    fn observe(&self, error: Option<&RemoteFetchError>) -> bool {
        match error {
            Some(e) if is_transport(e) => {
                if !self.offline.swap(true, Ordering::SeqCst) {
                    log::warn!("[fetch] transport failure, marking offline: {e}");
                }
                false
            }
            None => self.offline.swap(false, Ordering::SeqCst),
            Some(_) => false,
        }
    }

    fn recheck_delay(&self, attempt: u32) -> Duration {
        self.recheck_interval
            .saturating_mul(1u32 << attempt.min(5))
            .min(MAX_RECHECK_INTERVAL)
    }
}

fn is_transport(e: &RemoteFetchError) -> bool {
    e.status.is_none()
}

async fn serve(client: &QueryClient, req: &FetchRequest, force: bool) -> AppEvent {
    match req {
        FetchRequest::Page { page, .. } => {
            let page = *page;
            let result = if force {
                client.refetch_paginated(page).await
            } else {
                client.paginated(page).await
            };
            AppEvent::PageLoaded { page, result }
        }
        FetchRequest::Detail { id, .. } => {
            let result = if force {
                client.refetch_detail(id).await
            } else {
                client.detail(id).await
            };
            AppEvent::DetailLoaded { id: id.clone(), result }
        }
    }
}

fn error_of(event: &AppEvent) -> Option<&RemoteFetchError> {
    match event {
        AppEvent::PageLoaded { result: Err(e), .. } | AppEvent::DetailLoaded { result: Err(e), .. } => {
            Some(e)
        }
        _ => None,
    }
}

/// Background task that serves page and detail requests through the query
/// client. Each request runs on its own task; identical requests are
/// collapsed by the cache. A request that fails for lack of a connection
/// keeps re-running until it succeeds or a newer request replaces it.
pub async fn run_fetch_worker(
    client: QueryClient,
    connectivity: Connectivity,
    mut req_rx: UnboundedReceiver<FetchRequest>,
    event_tx: UnboundedSender<AppEvent>,
) -> Result<()> {
    log::info!("[fetch] worker started");
    let latest = Arc::new(AtomicU64::new(0));

    while let Some(req) = req_rx.recv().await {
        log::debug!("[fetch] {req:?}");
        let seq = latest.fetch_add(1, Ordering::SeqCst) + 1;

        let client = client.clone();
        let event_tx = event_tx.clone();
        let connectivity = connectivity.clone();
        let latest = Arc::clone(&latest);
        tokio::spawn(async move {
            let mut force = req.is_forced();
            let mut attempt = 0u32;
            loop {
                let event = serve(&client, &req, force).await;
                let error = error_of(&event);
                let reconnected = connectivity.observe(error);
                let offline = error.is_some_and(is_transport);

                // the result goes out before the reconnect so the app sees it settled
                if event_tx.send(event).is_err() {
                    log::debug!("[fetch] app loop gone, result dropped");
                    return;
                }
                if reconnected {
                    client.on_reconnect();
                    let _ = event_tx.send(AppEvent::Reconnected);
                }
                if !offline {
                    return;
                }

                let delay = connectivity.recheck_delay(attempt);
                attempt += 1;
                tokio::time::sleep(delay).await;
                if latest.load(Ordering::SeqCst) != seq {
                    log::debug!("[fetch] {req:?} superseded, stop rechecking");
                    return;
                }
                log::info!("[fetch] offline, rechecking with {req:?} (attempt {attempt})");
                force = true;
            }
        });
    }

    log::info!("[fetch] worker shutting down");
    Ok(())
}

/// Spawn an infinite feed tagged with `epoch`; its events go to `event_tx`.
/// Dropping the returned sender (or aborting the handle) ends the feed.
/// A page that fails for lack of a connection is re-requested on the recheck
/// schedule of `connectivity`.
pub fn spawn_feed(
    client: QueryClient,
    connectivity: Connectivity,
    epoch: u64,
    event_tx: UnboundedSender<AppEvent>,
) -> (SignalSender, tokio::task::JoinHandle<()>) {
    let (signal_tx, signal) = channel_signal();
    let retry = signal_tx.downgrade();
    let handle = tokio::spawn(async move {
        let mut feed = InfiniteFeed::new(client.clone());
        let mut attempt = 0u32;
        feed.run(signal, move |event| {
            if let FeedEvent::Fetching { .. } = event {
                let _ = event_tx.send(AppEvent::Feed { epoch, event });
                return;
            }
            let error = match &event {
                FeedEvent::Failed(e) => Some(e),
                _ => None,
            };
            let reconnected = connectivity.observe(error);
            let offline = error.is_some_and(is_transport);

            let _ = event_tx.send(AppEvent::Feed { epoch, event });
            if reconnected {
                client.on_reconnect();
                let _ = event_tx.send(AppEvent::Reconnected);
            }
            if !offline {
                attempt = 0;
                return;
            }

            let delay = connectivity.recheck_delay(attempt);
            attempt += 1;
            let retry = retry.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                retry.notify();
            });
        })
        .await;
    });
    (signal_tx, handle)
}
