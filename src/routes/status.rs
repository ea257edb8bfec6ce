//! `GET /api/status`: upstream reachability plus poller state.

use axum::{extract::State, routing::get, Json, Router};
use tracing::debug;

use super::AppState;
use crate::monitor::StatusReport;

// ---

pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", get(status))
}

async fn status(State(monitor): State<AppState>) -> Json<StatusReport> {
    // ---
    let report = monitor.status().await;
    debug!(
        "GET /api/status - connected={} stale={}",
        report.connected, report.stale
    );
    Json(report)
}
