//! `GET /api/historical` and `GET /api/historical/{param}`.
//!
//! `hours` selects the lookback window (1, 3, 6, 12 or 24; default 1).
//!
//! The single-parameter route answers with a bare `[{timestamp, value}]`
//! array, the same form a backend upstream is read in. Whether it came from
//! a stale cache entry is reported in the [`STALE_HEADER`] response header.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::error::ApiError;
use crate::models::{HistoricalSeriesSet, LookbackWindow, Parameter};

// ---

/// `true` when the body is a cached series served after a failed fetch.
pub const STALE_HEADER: &str = "x-data-stale";

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/historical", get(all_parameters))
        .route("/api/historical/{param}", get(one_parameter))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    hours: Option<u32>,
}

impl HistoryQuery {
    fn window(&self) -> Result<LookbackWindow, ApiError> {
        // ---
        let hours = self.hours.unwrap_or(1);
        LookbackWindow::from_hours(hours).ok_or(ApiError::InvalidWindow(hours))
    }
}

#[derive(Serialize)]
struct SeriesSetResponse<'a> {
    #[serde(flatten)]
    series: &'a HistoricalSeriesSet,
    stale: bool,
}

async fn all_parameters(
    Query(query): Query<HistoryQuery>,
    State(monitor): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // ---
    let window = query.window()?;
    debug!("GET /api/historical?hours={}", window.hours());

    let served = monitor.historical(window).await?;
    let body = serde_json::to_value(SeriesSetResponse {
        series: &served.data,
        stale: served.stale,
    })
    .map_err(anyhow::Error::from)?;

    Ok(Json(body))
}

async fn one_parameter(
    Path(param): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(monitor): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    // ---
    let parameter: Parameter = param.parse()?;
    let window = query.window()?;
    debug!("GET /api/historical/{}?hours={}", parameter, window.hours());

    let served = monitor.parameter_history(parameter, window).await?;
    let stale = if served.stale { "true" } else { "false" };

    Ok(([(STALE_HEADER, stale)], Json(served.data)))
}
