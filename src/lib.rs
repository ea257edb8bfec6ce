//! `envmonitor`: environmental reading normalizer service.
//!
//! Polls an upstream (ThingsBoard telemetry or another backend), normalizes
//! the payload into one reading per monitored parameter, classifies every
//! value against its thresholds and serves the result over HTTP.
//!
//! Module boundaries:
//! - `models`, `thresholds`, `classify`: the domain model and its rules
//! - `normalize`, `aqi`: upstream JSON to model
//! - `upstream`, `snapshot`, `monitor`: fetching and shared state
//! - `routes`: the HTTP surface
//! - `config`, `error`: ambient concerns

pub mod aqi;
pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod normalize;
pub mod routes;
pub mod snapshot;
pub mod thresholds;
pub mod upstream;

pub use config::{Config, UpstreamConfig};
pub use error::{ApiError, FetchError, NormalizeError, UnknownParameter};
pub use models::{
    Connectivity, CurrentReadingSet, DeviceStatus, HistoricalPoint, HistoricalSeriesSet,
    LookbackWindow, Parameter, Reading, StatusTier,
};
pub use monitor::Monitor;
pub use normalize::Normalizer;
