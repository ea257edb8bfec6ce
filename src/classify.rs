//! Reading classification and device connectivity derivation.
//!
//! Pure functions of their inputs and the static threshold table.

use chrono::{DateTime, Utc};

use crate::models::{Connectivity, DeviceStatus, Parameter, StatusTier};
use crate::thresholds;

// ---

/// Data older than this marks the device inactive.
pub const INACTIVE_AFTER_MS: i64 = 15 * 60 * 1000;

/// Data older than this marks the device offline.
pub const OFFLINE_AFTER_MS: i64 = 60 * 60 * 1000;

/// Map a raw value onto a status tier. Never yields `Poor`; that tier only
/// arrives verbatim from an upstream.
pub fn classify(parameter: Parameter, value: Option<f64>) -> StatusTier {
    // ---
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return StatusTier::Unknown;
    };

    let t = thresholds::thresholds(parameter);
    if value >= t.danger {
        StatusTier::Danger
    } else if value >= t.warning {
        StatusTier::Warning
    } else {
        StatusTier::Normal
    }
}

/// An upstream status other than `unknown` wins over recomputation.
pub fn resolve(parameter: Parameter, value: Option<f64>, upstream: Option<StatusTier>) -> StatusTier {
    // ---
    match upstream {
        Some(tier) if tier != StatusTier::Unknown => tier,
        _ => classify(parameter, value),
    }
}

/// Device connectivity from an explicit upstream status, the newest data
/// timestamp and the current time.
pub fn device_status(
    explicit: Option<Connectivity>,
    last_data_timestamp: Option<i64>,
    now: DateTime<Utc>,
) -> DeviceStatus {
    // ---
    if let Some(status) = explicit.filter(|s| *s != Connectivity::Unknown) {
        return DeviceStatus {
            status,
            last_timestamp: last_data_timestamp,
        };
    }

    let Some(last) = last_data_timestamp else {
        return DeviceStatus {
            status: Connectivity::Unknown,
            last_timestamp: None,
        };
    };

    let elapsed = now.timestamp_millis() - last;
    let status = if elapsed < INACTIVE_AFTER_MS {
        Connectivity::Online
    } else if elapsed < OFFLINE_AFTER_MS {
        Connectivity::Inactive
    } else {
        Connectivity::Offline
    };

    DeviceStatus {
        status,
        last_timestamp: Some(last),
    }
}
