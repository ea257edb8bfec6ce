//! Error taxonomy for the envmonitor service.
//!
//! Three failure classes matter to callers:
//! - [`NormalizeError`]: an upstream payload had the wrong shape. The poll
//!   cycle fails, the last good snapshot stays in place.
//! - [`FetchError`]: the upstream could not be reached or answered with an
//!   error status. [`FetchError::is_network_failure`] separates this from a
//!   malformed body.
//! - [`UnknownParameter`]: a key outside the fixed parameter set. Normalization
//!   skips such keys; only explicit lookups (route paths) surface it.
//!
//! [`ApiError`] maps all of them onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

// ---

/// An upstream payload could not be normalized.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("malformed payload at `{context}`: {reason}")]
    MalformedPayload { context: String, reason: String },
}

impl NormalizeError {
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        // ---
        NormalizeError::MalformedPayload {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// A parameter key outside the monitored set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown parameter `{0}`")]
pub struct UnknownParameter(pub String);

/// Failure of one fetch-normalize cycle against the upstream.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("upstream answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream request timed out")]
    Timeout,

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

impl FetchError {
    /// True for fetch-level failures, false when the body arrived but was malformed.
    pub fn is_network_failure(&self) -> bool {
        // ---
        !matches!(self, FetchError::Normalize(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // ---
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Normalize(NormalizeError::malformed("$", e.to_string()))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Errors returned by the HTTP routes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no reading has been received from the upstream yet")]
    NotReady,

    #[error(transparent)]
    UnknownParameter(#[from] UnknownParameter),

    #[error("unsupported lookback window of {0} hours (expected 1, 3, 6, 12 or 24)")]
    InvalidWindow(u32),

    #[error("upstream error: {0}")]
    Upstream(#[from] FetchError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        // ---
        match self {
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UnknownParameter(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status_code();

        let (message, error_id) = match &self {
            ApiError::Internal(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Internal error: {}", e);
                ("Internal server error".to_string(), Some(error_id.to_string()))
            }
            ApiError::Upstream(e) => {
                tracing::warn!("Upstream error surfaced to client: {}", e);
                (self.to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        let mut error_obj = json!({
            "code": status.as_u16(),
            "message": message,
        });

        if let Some(error_id) = error_id {
            error_obj["error_id"] = json!(error_id);
        }

        (status, Json(json!({ "error": error_obj }))).into_response()
    }
}
