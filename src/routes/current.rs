//! `GET /api/current` and `GET /api/cards`: views of the last good snapshot.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::debug;

use super::AppState;
use crate::aqi::AqiLevel;
use crate::error::ApiError;
use crate::models::{CurrentReadingSet, Parameter, ParameterCard};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/api/current", get(current))
        .route("/api/cards", get(cards))
}

#[derive(Serialize)]
struct CurrentResponse<'a> {
    #[serde(flatten)]
    set: &'a CurrentReadingSet,
    stale: bool,
}

#[derive(Serialize)]
struct AqiSummary {
    level: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct CardsResponse {
    cards: Vec<ParameterCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aqi: Option<AqiSummary>,
    has_warning: bool,
    has_danger: bool,
    stale: bool,
}

async fn current(State(monitor): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    // ---
    debug!("GET /api/current");

    let snapshot = monitor.snapshot().await;
    let set = snapshot.current.as_ref().ok_or(ApiError::NotReady)?;

    let body = serde_json::to_value(CurrentResponse {
        set,
        stale: snapshot.stale,
    })
    .map_err(anyhow::Error::from)?;

    Ok(Json(body))
}

async fn cards(State(monitor): State<AppState>) -> Result<Json<CardsResponse>, ApiError> {
    // ---
    debug!("GET /api/cards");

    let snapshot = monitor.snapshot().await;
    let set = snapshot.current.as_ref().ok_or(ApiError::NotReady)?;

    let aqi = set
        .get(Parameter::Aqi)
        .value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| {
            let level = AqiLevel::from_index(v.round().min(f64::from(u16::MAX)) as u16);
            AqiSummary {
                level: level.label(),
                description: level.description(),
            }
        });

    Ok(Json(CardsResponse {
        cards: set.cards(),
        aqi,
        has_warning: set.has_any_warning(),
        has_danger: set.has_any_danger(),
        stale: snapshot.stale,
    }))
}
