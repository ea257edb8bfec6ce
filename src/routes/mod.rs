//! Route gateway: merges every endpoint subrouter and attaches the shared
//! [`Monitor`] as state.

use std::sync::Arc;

use axum::Router;

use crate::monitor::Monitor;

mod current;
mod health;
mod historical;
mod status;

pub use historical::STALE_HEADER;

// ---

/// State shared by every handler.
pub type AppState = Arc<Monitor>;

pub fn router(monitor: AppState) -> Router {
    // ---
    Router::new()
        .merge(current::router())
        .merge(historical::router())
        .merge(status::router())
        .merge(health::router())
        .with_state(monitor)
}
