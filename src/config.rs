//! Configuration loader for the `envmonitor` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). The resulting [`Config`] is built once and passed
//! explicitly to every collaborator; nothing else reads the environment.
//!
use std::env;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use chrono::{FixedOffset, Offset, Utc};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

pub const DEFAULT_THINGSBOARD_URL: &str = "https://demo.thingsboard.io";

/// Where current and historical readings come from.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamConfig {
    /// ThingsBoard telemetry REST API.
    ThingsBoard {
        url: String,
        device_id: String,
        access_token: String,
        /// Telemetry keys requested for time-series queries.
        keys: Vec<String>,
        /// Max points per key in a time-series query.
        history_limit: u32,
    },
    /// Another backend already speaking the `/api/current` wire form.
    Backend { url: String },
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Upstream data source.
    pub upstream: UpstreamConfig,

    /// HTTP listen port.
    pub listen_port: u16,

    /// Period of the current-snapshot poll.
    pub poll_interval: Duration,

    /// Per-request upstream timeout.
    pub fetch_timeout: Duration,

    /// How long a fetched historical series is served without refetching.
    pub history_cache_ttl: Duration,

    /// Offset used to render timestamp labels.
    pub display_offset: FixedOffset,

    /// Fill a missing `aqi` reading from PM2.5/PM10/CO.
    pub derive_aqi: bool,
}

impl Config {
    /// Defaults for everything but the upstream.
    pub fn with_upstream(upstream: UpstreamConfig) -> Self {
        // ---
        Config {
            upstream,
            listen_port: 8080,
            poll_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(30),
            history_cache_ttl: Duration::from_secs(60),
            display_offset: vn_offset(),
            derive_aqi: true,
        }
    }
}

/// Telemetry keys queried when `THINGSBOARD_KEYS` is unset.
pub fn default_telemetry_keys() -> Vec<String> {
    ["temperature", "humidity", "pm10", "pm25", "co", "noise", "aqi"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

fn vn_offset() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix())
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `THINGSBOARD_DEVICE_ID`, `THINGSBOARD_ACCESS_TOKEN` – when `UPSTREAM_KIND=thingsboard` (default)
/// - `BACKEND_URL` – when `UPSTREAM_KIND=backend`
///
/// Optional:
/// - `THINGSBOARD_URL` – (default: https://demo.thingsboard.io)
/// - `THINGSBOARD_KEYS` – comma separated telemetry keys (default: the seven parameters)
/// - `HISTORY_LIMIT` – max points per key (default: 1000)
/// - `LISTEN_PORT` – (default: 8080)
/// - `POLL_INTERVAL_SECS` – (default: 30)
/// - `FETCH_TIMEOUT_SECS` – (default: 30)
/// - `HISTORY_CACHE_SECS` – (default: 60)
/// - `DISPLAY_UTC_OFFSET_HOURS` – (default: 7)
/// - `DERIVE_AQI` – (default: true)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let kind = env::var("UPSTREAM_KIND").unwrap_or_else(|_| "thingsboard".to_string());

    let upstream = match kind.trim().to_ascii_lowercase().as_str() {
        "thingsboard" => UpstreamConfig::ThingsBoard {
            url: env::var("THINGSBOARD_URL").unwrap_or_else(|_| DEFAULT_THINGSBOARD_URL.to_string()),
            device_id: require_env!("THINGSBOARD_DEVICE_ID"),
            access_token: require_env!("THINGSBOARD_ACCESS_TOKEN"),
            keys: env::var("THINGSBOARD_KEYS")
                .map(|v| parse_key_list(&v))
                .unwrap_or_else(|_| default_telemetry_keys()),
            history_limit: parse_env!("HISTORY_LIMIT", u32, 1000),
        },
        "backend" => UpstreamConfig::Backend {
            url: require_env!("BACKEND_URL"),
        },
        other => bail!("Invalid UPSTREAM_KIND: `{}` (expected `thingsboard` or `backend`)", other),
    };

    let offset_hours = parse_env!("DISPLAY_UTC_OFFSET_HOURS", i32, 7);
    let display_offset = FixedOffset::east_opt(offset_hours * 3600)
        .ok_or_else(|| anyhow!("Invalid DISPLAY_UTC_OFFSET_HOURS: {}", offset_hours))?;

    let poll_secs = parse_env!("POLL_INTERVAL_SECS", u64, 30);
    if poll_secs == 0 {
        bail!("Invalid POLL_INTERVAL_SECS: must be greater than zero");
    }

    Ok(Config {
        upstream,
        listen_port: parse_env!("LISTEN_PORT", u16, 8080),
        poll_interval: Duration::from_secs(poll_secs),
        fetch_timeout: Duration::from_secs(parse_env!("FETCH_TIMEOUT_SECS", u64, 30)),
        history_cache_ttl: Duration::from_secs(parse_env!("HISTORY_CACHE_SECS", u64, 60)),
        display_offset,
        derive_aqi: parse_flag(env::var("DERIVE_AQI").ok().as_deref(), true)
            .ok_or_else(|| anyhow!("Invalid DERIVE_AQI: expected true/false"))?,
    })
}

fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// `None` on an unrecognised value.
fn parse_flag(raw: Option<&str>, default: bool) -> Option<bool> {
    // ---
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Some(default),
        Some("1") | Some("true") | Some("yes") | Some("on") => Some(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Some(false),
        Some(_) => None,
    }
}

/// Keep the first four characters of a secret.
fn mask_secret(secret: &str) -> String {
    // ---
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the ThingsBoard access token while showing all configuration
    /// values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        match &self.upstream {
            UpstreamConfig::ThingsBoard {
                url,
                device_id,
                access_token,
                keys,
                history_limit,
            } => {
                tracing::info!("  UPSTREAM_KIND            : thingsboard");
                tracing::info!("  THINGSBOARD_URL          : {}", url);
                tracing::info!("  THINGSBOARD_DEVICE_ID    : {}", device_id);
                tracing::info!("  THINGSBOARD_ACCESS_TOKEN : {}", mask_secret(access_token));
                tracing::info!("  THINGSBOARD_KEYS         : {}", keys.join(","));
                tracing::info!("  HISTORY_LIMIT            : {}", history_limit);
            }
            UpstreamConfig::Backend { url } => {
                tracing::info!("  UPSTREAM_KIND            : backend");
                tracing::info!("  BACKEND_URL              : {}", url);
            }
        }
        tracing::info!("  LISTEN_PORT              : {}", self.listen_port);
        tracing::info!("  POLL_INTERVAL_SECS       : {}", self.poll_interval.as_secs());
        tracing::info!("  FETCH_TIMEOUT_SECS       : {}", self.fetch_timeout.as_secs());
        tracing::info!("  HISTORY_CACHE_SECS       : {}", self.history_cache_ttl.as_secs());
        tracing::info!("  DISPLAY_UTC_OFFSET       : {}", self.display_offset);
        tracing::info!("  DERIVE_AQI               : {}", self.derive_aqi);
    }
}
