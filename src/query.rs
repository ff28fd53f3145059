//! Keyed query cache with staleness, retries and in-flight deduplication.
//!
//! A [`QueryCache`] memoizes one result type. Entries are keyed by
//! [`QueryKey`] (operation name + parameters). For a given key at most one
//! fetch runs at a time; every caller that arrives while it runs joins it and
//! sees the same resolution. Fetches run on their own task, so a caller that
//! goes away does not cancel the fetch for anyone else.
//!
//! Reads of an entry:
//! - fresh (younger than `stale_time`, not invalidated): returned, no call
//! - stale: returned immediately, a background refetch is started
//! - missing: the caller waits for the (shared) fetch
//!
//! Failures are retried `retry` extra times with exponential backoff before
//! being stored on the entry and handed to the waiting callers.

use futures::future::BoxFuture;
use futures::FutureExt;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::error::{RemoteFetchError, Result};

/// Logical identity of a cached result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    operation: &'static str,
    params: Vec<String>,
}

impl QueryKey {
    pub fn new<I, P>(operation: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: ToString,
    {
        Self {
            operation,
            params: params.into_iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn paginated_list(page: u32) -> Self {
        Self::new("paginatedList", [page])
    }

    pub fn infinite_page(offset: u32) -> Self {
        Self::new("infiniteList", [offset])
    }

    pub fn detail(id: &str) -> Self {
        Self::new("detail", [id])
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.params.join(","))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a successful result counts as fresh.
    pub stale_time: Duration,
    /// Extra attempts after the first failure.
    pub retry: u32,
    /// Base delay between attempts; doubles per attempt, capped at 30s.
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            retry: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

impl QueryOptions {
    fn backoff(&self, attempt: u32) -> Duration {
        if self.retry_delay.is_zero() {
            return Duration::ZERO;
        }
        let base = self
            .retry_delay
            .saturating_mul(1u32 << (attempt.clamp(1, 6) - 1))
            .min(MAX_RETRY_DELAY);
        let jitter_ms = (base.as_millis() as u64 / 4).min(250);
        base + Duration::from_millis(thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Snapshot of one query for rendering.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    /// No data yet and a fetch is running.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<RemoteFetchError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_fetching: false,
            is_error: false,
            error: None,
        }
    }
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;
type Waiter<T> = oneshot::Sender<Result<Arc<T>>>;

struct Entry<T> {
    data: Option<(Arc<T>, Instant)>,
    invalidated: bool,
    error: Option<RemoteFetchError>,
    in_flight: bool,
    waiters: Vec<Waiter<T>>,
}

impl<T> Entry<T> {
    fn new() -> Self {
        Self {
            data: None,
            invalidated: false,
            error: None,
            in_flight: false,
            waiters: Vec::new(),
        }
    }

    fn is_fresh(&self, stale_time: Duration) -> bool {
        match &self.data {
            Some((_, at)) => !self.invalidated && at.elapsed() < stale_time,
            None => false,
        }
    }
}

struct Inner<T> {
    name: &'static str,
    options: QueryOptions,
    entries: Mutex<HashMap<QueryKey, Entry<T>>>,
    /// Bumped by `clear`; fetches started before a clear don't store results.
    epoch: AtomicU64,
}

/// Memoized results of one type. Clones share the same entries.
pub struct QueryCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> QueryCache<T>
where
    T: Send + Sync + 'static,
{
    /// `name` only tags log lines.
    pub fn new(name: &'static str, options: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                options,
                entries: Mutex::new(HashMap::new()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.inner.options
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry<T>>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached value for `key`, fetching it when missing and refreshing it in
    /// the background when stale.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (rx, start) = {
            let mut map = self.entries();
            let entry = map.entry(key.clone()).or_insert_with(Entry::new);
            if let Some((data, _)) = &entry.data {
                let data = Arc::clone(data);
                if entry.is_fresh(self.inner.options.stale_time) {
                    log::debug!("[query:{}] hit {key}", self.inner.name);
                    return Ok(data);
                }
                let start = !entry.in_flight;
                entry.in_flight = true;
                drop(map);
                if start {
                    log::debug!("[query:{}] stale {key}, refreshing", self.inner.name);
                    self.start(key, boxed(fetcher));
                }
                return Ok(data);
            }
            let (tx, rx) = oneshot::channel();
            entry.waiters.push(tx);
            let start = !entry.in_flight;
            entry.in_flight = true;
            (rx, start)
        };
        if start {
            log::debug!("[query:{}] miss {key}", self.inner.name);
            self.start(key, boxed(fetcher));
        } else {
            log::debug!("[query:{}] joining in-flight {key}", self.inner.name);
        }
        Self::wait(rx).await
    }

    /// Fetch `key` regardless of freshness (joins a fetch that is already running).
    pub async fn refetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (rx, start) = {
            let mut map = self.entries();
            let entry = map.entry(key.clone()).or_insert_with(Entry::new);
            let (tx, rx) = oneshot::channel();
            entry.waiters.push(tx);
            let start = !entry.in_flight;
            entry.in_flight = true;
            (rx, start)
        };
        if start {
            log::debug!("[query:{}] refetch {key}", self.inner.name);
            self.start(key, boxed(fetcher));
        }
        Self::wait(rx).await
    }

    async fn wait(rx: oneshot::Receiver<Result<Arc<T>>>) -> Result<Arc<T>> {
        rx.await
            .unwrap_or_else(|_| Err(RemoteFetchError::new("query was cleared before it resolved")))
    }

    fn start(&self, key: QueryKey, fetcher: Fetcher<T>) {
        let cache = self.clone();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        tokio::spawn(async move {
            let result = cache.run_with_retry(&key, &fetcher).await;
            cache.settle(key, epoch, result);
        });
    }

    async fn run_with_retry(&self, key: &QueryKey, fetcher: &Fetcher<T>) -> Result<Arc<T>> {
        let retries = self.inner.options.retry;
        let mut attempt = 0u32;
        loop {
            match fetcher().await {
                Ok(v) => return Ok(Arc::new(v)),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    let delay = self.inner.options.backoff(attempt);
                    log::warn!(
                        "[query:{}] {key} failed: {e}; retry={attempt}/{retries} backoff={}ms",
                        self.inner.name,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn settle(&self, key: QueryKey, epoch: u64, result: Result<Arc<T>>) {
        if let Err(e) = &result {
            log::error!("[query:{}] {key} failed: {e}", self.inner.name);
        }
        let waiters = {
            let mut map = self.entries();
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                log::debug!("[query:{}] dropping result of cleared {key}", self.inner.name);
                return;
            }
            let Some(entry) = map.get_mut(&key) else {
                return;
            };
            entry.in_flight = false;
            match &result {
                Ok(v) => {
                    entry.data = Some((Arc::clone(v), Instant::now()));
                    entry.invalidated = false;
                    entry.error = None;
                }
                Err(e) => entry.error = Some(e.clone()),
            }
            std::mem::take(&mut entry.waiters)
        };
        for w in waiters {
            // a waiter whose caller went away just drops the value
            let _ = w.send(result.clone());
        }
    }

    pub fn state(&self, key: &QueryKey) -> QueryState<T> {
        let map = self.entries();
        let Some(entry) = map.get(key) else {
            return QueryState::default();
        };
        let data = entry.data.as_ref().map(|(d, _)| Arc::clone(d));
        QueryState {
            is_loading: data.is_none() && entry.in_flight,
            is_fetching: entry.in_flight,
            is_error: entry.error.is_some(),
            error: entry.error.clone(),
            data,
        }
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entries()
            .get(key)
            .is_some_and(|e| e.is_fresh(self.inner.options.stale_time))
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.entries().get(key).is_some_and(|e| e.in_flight)
    }

    /// Mark `key` stale; the next read refetches it.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(e) = self.entries().get_mut(key) {
            e.invalidated = true;
        }
    }

    pub fn invalidate_all(&self) {
        for e in self.entries().values_mut() {
            e.invalidated = true;
        }
    }

    /// Drop every entry. Callers still waiting get an error; fetches still
    /// running finish but their results are discarded.
    pub fn clear(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn boxed<T, F, Fut>(fetcher: F) -> Fetcher<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || fetcher().boxed())
}
