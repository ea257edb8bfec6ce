//! Shared state read by the HTTP handlers.
//!
//! [`SnapshotStore`] holds the last good current reading set. Writers build a
//! new [`Snapshot`] and swap the `Arc`, so readers always see a complete one.
//! [`HistoryCache`] keeps one historical series set per lookback window and
//! one single-parameter series per (parameter, window).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::FetchError;
use crate::models::{CurrentReadingSet, HistoricalPoint, HistoricalSeriesSet, LookbackWindow, Parameter};

// ---

/// Immutable view of the poller's progress.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    // ---
    /// Last successfully normalized set; `None` until the first good poll.
    pub current: Option<Arc<CurrentReadingSet>>,

    /// Set when the most recent poll failed.
    pub stale: bool,

    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self) -> Arc<Snapshot> {
        self.inner.read().await.clone()
    }

    /// Replace the current set and clear the stale flag.
    pub async fn record_success(&self, set: CurrentReadingSet, at: DateTime<Utc>) {
        // ---
        let next = Arc::new(Snapshot {
            current: Some(Arc::new(set)),
            stale: false,
            last_success: Some(at),
            last_error: None,
        });
        *self.inner.write().await = next;
    }

    /// Keep the current set, mark it stale and remember why.
    pub async fn record_failure(&self, error: &FetchError) {
        // ---
        let mut guard = self.inner.write().await;
        let next = Arc::new(Snapshot {
            current: guard.current.clone(),
            stale: true,
            last_success: guard.last_success,
            last_error: Some(error.to_string()),
        });
        *guard = next;
    }
}

/// A value plus whether it came from a fallback after a failed fetch.
#[derive(Debug, Clone)]
pub struct Served<T> {
    pub data: T,
    pub stale: bool,
}

#[derive(Debug, Clone)]
struct Cached<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// Fixed set of TTL slots. Each slot has its own lock, held across the
/// fetch, so at most one fetch per slot is in flight and waiters see the
/// fresh entry.
#[derive(Debug)]
struct Slots<T> {
    ttl: Duration,
    slots: Vec<Mutex<Option<Cached<T>>>>,
}

impl<T> Slots<T> {
    fn new(ttl: Duration, len: usize) -> Self {
        // ---
        Slots {
            ttl,
            slots: (0..len).map(|_| Mutex::new(None)).collect(),
        }
    }

    async fn get_or_fetch<F, Fut>(
        &self,
        index: usize,
        what: &str,
        fetch: F,
    ) -> Result<Served<Arc<T>>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        // ---
        let mut slot = self.slots[index].lock().await;

        if let Some(cached) = slot.as_ref().filter(|c| c.fetched_at.elapsed() < self.ttl) {
            return Ok(Served {
                data: cached.value.clone(),
                stale: false,
            });
        }

        match fetch().await {
            Ok(value) => {
                let value = Arc::new(value);
                *slot = Some(Cached {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(Served {
                    data: value,
                    stale: false,
                })
            }
            Err(e) => match slot.as_ref() {
                Some(cached) => {
                    warn!("History fetch for {} failed, serving stale series: {}", what, e);
                    Ok(Served {
                        data: cached.value.clone(),
                        stale: true,
                    })
                }
                None => Err(e),
            },
        }
    }
}

/// Historical series cached per lookback window, plus single-parameter
/// series cached per (parameter, window) for upstreams that serve them
/// separately.
///
/// A failed fetch falls back to the previous entry for the same slot,
/// marked stale.
#[derive(Debug)]
pub struct HistoryCache {
    sets: Slots<HistoricalSeriesSet>,
    series: Slots<Vec<HistoricalPoint>>,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        // ---
        let windows = LookbackWindow::ALL.len();
        HistoryCache {
            sets: Slots::new(ttl, windows),
            series: Slots::new(ttl, Parameter::ALL.len() * windows),
        }
    }

    /// All series for `window`, from cache or `fetch`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        window: LookbackWindow,
        fetch: F,
    ) -> Result<Served<Arc<HistoricalSeriesSet>>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HistoricalSeriesSet, FetchError>>,
    {
        // ---
        let what = format!("{}h", window.hours());
        self.sets.get_or_fetch(window.index(), &what, fetch).await
    }

    /// One parameter's series for `window`, from cache or `fetch`.
    pub async fn get_or_fetch_series<F, Fut>(
        &self,
        parameter: Parameter,
        window: LookbackWindow,
        fetch: F,
    ) -> Result<Served<Arc<Vec<HistoricalPoint>>>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<HistoricalPoint>, FetchError>>,
    {
        // ---
        let index = parameter.index() * LookbackWindow::ALL.len() + window.index();
        let what = format!("{} {}h", parameter, window.hours());
        self.series.get_or_fetch(index, &what, fetch).await
    }
}
