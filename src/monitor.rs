//! The poller and the query facade the HTTP layer talks to.
//!
//! One [`Monitor`] owns the upstream, the normalizer and the shared state.
//! [`Monitor::run`] refreshes the current snapshot on a fixed interval;
//! historical series are fetched on demand through the [`HistoryCache`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::aqi;
use crate::config::Config;
use crate::error::FetchError;
use crate::models::{Connectivity, HistoricalPoint, HistoricalSeriesSet, LookbackWindow, Parameter};
use crate::normalize::Normalizer;
use crate::snapshot::{HistoryCache, Served, Snapshot, SnapshotStore};
use crate::upstream::Upstream;

// ---

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    // ---
    pub connected: bool,
    pub thingsboard_connected: bool,
    pub data_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<Value>,
    /// Device connectivity from the last good snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceReport>,
}

/// Status-bar view of the device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub status: Connectivity,
    pub message: &'static str,
    pub last_update: String,
}

#[derive(Debug)]
pub struct Monitor {
    upstream: Upstream,
    normalizer: Normalizer,
    poll_interval: Duration,
    derive_aqi: bool,
    snapshot: SnapshotStore,
    history: HistoryCache,
}

impl Monitor {
    pub fn new(upstream: Upstream, cfg: &Config) -> Self {
        // ---
        Monitor {
            upstream,
            normalizer: Normalizer::new(cfg.display_offset),
            poll_interval: cfg.poll_interval,
            derive_aqi: cfg.derive_aqi,
            snapshot: SnapshotStore::new(),
            history: HistoryCache::new(cfg.history_cache_ttl),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(Upstream::from_config(cfg)?, cfg))
    }

    /// One fetch-normalize cycle. On failure the previous set is kept and
    /// marked stale.
    pub async fn poll_once(&self) -> Result<(), FetchError> {
        // ---
        let now = Utc::now();
        let result = self
            .upstream
            .fetch_current(&self.normalizer, now)
            .await
            .map(|set| if self.derive_aqi { aqi::with_derived_aqi(set) } else { set });

        match result {
            Ok(set) => {
                debug!(
                    "Polled {}: device {:?}, warning={}, danger={}",
                    self.upstream.data_source(),
                    set.device_status().status,
                    set.has_any_warning(),
                    set.has_any_danger()
                );
                self.snapshot.record_success(set, now).await;
                Ok(())
            }
            Err(e) => {
                self.snapshot.record_failure(&e).await;
                Err(e)
            }
        }
    }

    /// Poll forever. Missed ticks are skipped, so a slow upstream never
    /// causes a burst of back-to-back cycles.
    pub async fn run(self: Arc<Self>) {
        // ---
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Polling {} every {}s",
            self.upstream.data_source(),
            self.poll_interval.as_secs()
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                if e.is_network_failure() {
                    warn!("Upstream unreachable, keeping last snapshot: {}", e);
                } else {
                    warn!("Poll failed, keeping last snapshot: {}", e);
                }
            }
        }
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load().await
    }

    /// All series for `window`, cached per window.
    pub async fn historical(
        &self,
        window: LookbackWindow,
    ) -> Result<Served<Arc<HistoricalSeriesSet>>, FetchError> {
        // ---
        self.history
            .get_or_fetch(window, || {
                self.upstream
                    .fetch_historical(&self.normalizer, window, Utc::now())
            })
            .await
    }

    /// One parameter's series. ThingsBoard history is sliced out of the
    /// cached full window; a backend upstream is asked for the single series,
    /// cached per (parameter, window). Both fall back to a stale entry.
    pub async fn parameter_history(
        &self,
        parameter: Parameter,
        window: LookbackWindow,
    ) -> Result<Served<Vec<HistoricalPoint>>, FetchError> {
        // ---
        match &self.upstream {
            Upstream::ThingsBoard(_) => {
                let served = self.historical(window).await?;
                Ok(Served {
                    data: served.data.get(parameter).to_vec(),
                    stale: served.stale,
                })
            }
            Upstream::Backend(backend) => {
                let served = self
                    .history
                    .get_or_fetch_series(parameter, window, || {
                        backend.fetch_series(&self.normalizer, parameter, window)
                    })
                    .await?;
                Ok(Served {
                    data: served.data.as_ref().clone(),
                    stale: served.stale,
                })
            }
        }
    }

    pub async fn status(&self) -> StatusReport {
        // ---
        let connection = self.upstream.check_connection().await;
        let snapshot = self.snapshot.load().await;
        let now = Utc::now();

        let device = snapshot.current.as_ref().map(|set| {
            let device = set.device_status();
            DeviceReport {
                status: device.status,
                message: device.message(),
                last_update: device.last_update_text(now, self.normalizer.offset()),
            }
        });

        StatusReport {
            connected: connection.connected,
            thingsboard_connected: connection.connected && matches!(self.upstream, Upstream::ThingsBoard(_)),
            data_source: self.upstream.data_source(),
            device_id: self.upstream.device_id().map(String::from),
            stale: snapshot.stale,
            last_success: snapshot.last_success,
            last_error: snapshot.last_error.clone(),
            upstream: connection.upstream,
            device,
        }
    }
}
