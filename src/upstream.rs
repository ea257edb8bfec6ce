//! HTTP fetch layer for the two upstream kinds.
//!
//! Each call performs one request, checks the status, and hands the JSON body
//! to the [`Normalizer`]. Retries are not attempted here; the poll interval is
//! the retry.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, UpstreamConfig};
use crate::error::FetchError;
use crate::models::{CurrentReadingSet, HistoricalPoint, HistoricalSeriesSet, LookbackWindow, Parameter};
use crate::normalize::Normalizer;

// ---

/// ThingsBoard device telemetry (`/api/plugins/telemetry/DEVICE/{id}/values/timeseries`).
#[derive(Debug, Clone)]
pub struct ThingsBoardSource {
    client: Client,
    base_url: String,
    device_id: String,
    access_token: String,
    keys: Vec<String>,
    history_limit: u32,
}

/// A backend serving `/api/current`, `/api/historical` and `/api/status`.
#[derive(Debug, Clone)]
pub struct BackendSource {
    client: Client,
    base_url: String,
}

/// Result of a connectivity check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionReport {
    pub connected: bool,
    /// The upstream's own status body, for backend upstreams.
    pub upstream: Option<Value>,
}

/// The configured data source.
#[derive(Debug, Clone)]
pub enum Upstream {
    ThingsBoard(ThingsBoardSource),
    Backend(BackendSource),
}

impl Upstream {
    /// Build the source and its HTTP client from configuration.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        // ---
        let client = Client::builder()
            .timeout(cfg.fetch_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(match &cfg.upstream {
            UpstreamConfig::ThingsBoard {
                url,
                device_id,
                access_token,
                keys,
                history_limit,
            } => Upstream::ThingsBoard(ThingsBoardSource {
                client,
                base_url: url.trim_end_matches('/').to_string(),
                device_id: device_id.clone(),
                access_token: access_token.clone(),
                keys: keys.clone(),
                history_limit: *history_limit,
            }),
            UpstreamConfig::Backend { url } => Upstream::Backend(BackendSource {
                client,
                base_url: url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Human readable name of the data source.
    pub fn data_source(&self) -> &'static str {
        // ---
        match self {
            Upstream::ThingsBoard(_) => "ThingsBoard API",
            Upstream::Backend(_) => "Backend API",
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        // ---
        match self {
            Upstream::ThingsBoard(tb) => Some(&tb.device_id),
            Upstream::Backend(_) => None,
        }
    }

    pub async fn fetch_current(
        &self,
        normalizer: &Normalizer,
        now: DateTime<Utc>,
    ) -> Result<CurrentReadingSet, FetchError> {
        // ---
        match self {
            Upstream::ThingsBoard(tb) => {
                let body = get_json(tb.latest()).await?;
                Ok(normalizer.current_from_telemetry(&body, now)?)
            }
            Upstream::Backend(be) => {
                let body = get_json(be.get("/api/current")).await?;
                Ok(normalizer.current_from_backend(&body, now)?)
            }
        }
    }

    pub async fn fetch_historical(
        &self,
        normalizer: &Normalizer,
        window: LookbackWindow,
        now: DateTime<Utc>,
    ) -> Result<HistoricalSeriesSet, FetchError> {
        // ---
        match self {
            Upstream::ThingsBoard(tb) => {
                let body = get_json(tb.timeseries_range(window, now)).await?;
                Ok(normalizer.historical_from_telemetry(&body)?)
            }
            Upstream::Backend(be) => {
                let request = be
                    .get("/api/historical")
                    .query(&[("hours", window.hours())]);
                let body = get_json(request).await?;
                Ok(normalizer.historical_from_backend(&body)?)
            }
        }
    }

    /// Check the upstream. Never fails; an unreachable upstream is `connected: false`.
    pub async fn check_connection(&self) -> ConnectionReport {
        // ---
        match self {
            Upstream::ThingsBoard(tb) => match get_json(tb.latest()).await {
                Ok(body) => {
                    let keys = body.as_object().map_or(0, |o| o.len());
                    debug!("ThingsBoard connection ok, {} telemetry keys", keys);
                    ConnectionReport {
                        connected: true,
                        upstream: None,
                    }
                }
                Err(e) => {
                    debug!("ThingsBoard connection check failed: {}", e);
                    ConnectionReport {
                        connected: false,
                        upstream: None,
                    }
                }
            },
            Upstream::Backend(be) => match get_json(be.get("/api/status")).await {
                Ok(body) => ConnectionReport {
                    connected: true,
                    upstream: Some(body),
                },
                Err(e) => {
                    debug!("Backend status check failed: {}", e);
                    ConnectionReport {
                        connected: false,
                        upstream: None,
                    }
                }
            },
        }
    }
}

impl ThingsBoardSource {
    fn timeseries_url(&self) -> String {
        format!(
            "{}/api/plugins/telemetry/DEVICE/{}/values/timeseries",
            self.base_url, self.device_id
        )
    }

    fn timeseries(&self) -> RequestBuilder {
        // ---
        self.client
            .get(self.timeseries_url())
            .header("X-Authorization", format!("Bearer {}", self.access_token))
    }

    /// Latest value of every configured key.
    fn latest(&self) -> RequestBuilder {
        self.timeseries().query(&[("keys", self.keys.join(","))])
    }

    /// All samples of the configured keys inside the window ending at `now`.
    fn timeseries_range(&self, window: LookbackWindow, now: DateTime<Utc>) -> RequestBuilder {
        // ---
        let end_ts = now.timestamp_millis();
        let start_ts = end_ts - window.millis();

        self.timeseries().query(&[
            ("keys", self.keys.join(",")),
            ("startTs", start_ts.to_string()),
            ("endTs", end_ts.to_string()),
            ("limit", self.history_limit.to_string()),
        ])
    }
}

impl BackendSource {
    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.base_url, path))
    }

    /// One parameter's series from `/api/historical/{param}`.
    pub async fn fetch_series(
        &self,
        normalizer: &Normalizer,
        parameter: Parameter,
        window: LookbackWindow,
    ) -> Result<Vec<HistoricalPoint>, FetchError> {
        // ---
        let request = self
            .get(&format!("/api/historical/{}", parameter.as_str()))
            .query(&[("hours", window.hours())]);
        let body = get_json(request).await?;
        Ok(normalizer.series_from_backend(&body, parameter.as_str())?)
    }
}

/// Send, require a 2xx status and decode the JSON body.
async fn get_json(request: RequestBuilder) -> Result<Value, FetchError> {
    // ---
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let body: Value = response.json().await?;
    debug!("Upstream {} responded with {} bytes of JSON", status, body.to_string().len());
    Ok(body)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn thingsboard() -> ThingsBoardSource {
        // ---
        ThingsBoardSource {
            client: Client::new(),
            base_url: "https://tb.example".to_string(),
            device_id: "dev-1".to_string(),
            access_token: "token".to_string(),
            keys: vec!["Temperature".into(), "PM2.5".into(), "pm25".into(), "Sound".into()],
            history_limit: 500,
        }
    }

    fn query_of(request: &reqwest::Request) -> Vec<(String, String)> {
        request.url().query_pairs().into_owned().collect()
    }

    #[test]
    fn test_latest_requests_configured_keys() {
        // ---
        let tb = thingsboard();
        let request = tb.latest().build().unwrap();

        assert_eq!(request.url().path(), "/api/plugins/telemetry/DEVICE/dev-1/values/timeseries");
        assert_eq!(
            query_of(&request),
            vec![("keys".to_string(), "Temperature,PM2.5,pm25,Sound".to_string())]
        );
        assert_eq!(
            request.headers().get("X-Authorization").unwrap().to_str().unwrap(),
            "Bearer token"
        );
    }

    #[test]
    fn test_timeseries_range_query() {
        // ---
        let tb = thingsboard();
        let now = Utc.with_ymd_and_hms(2025, 3, 26, 0, 0, 0).unwrap();
        let request = tb
            .timeseries_range(LookbackWindow::ThreeHours, now)
            .build()
            .unwrap();

        let url = request.url();
        assert_eq!(url.path(), "/api/plugins/telemetry/DEVICE/dev-1/values/timeseries");

        let query = query_of(&request);
        let end = now.timestamp_millis();
        assert!(query.contains(&("keys".into(), "Temperature,PM2.5,pm25,Sound".into())));
        assert!(query.contains(&("startTs".into(), (end - 3 * 3_600_000).to_string())));
        assert!(query.contains(&("endTs".into(), end.to_string())));
        assert!(query.contains(&("limit".into(), "500".into())));
        assert_eq!(
            request.headers().get("X-Authorization").unwrap().to_str().unwrap(),
            "Bearer token"
        );
    }
}
