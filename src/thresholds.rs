//! Static per-parameter configuration and the localisation table.
//!
//! This is the single threshold table every surface classifies against. The
//! values are the backend ones; the mobile detail screen carried different
//! literals (temperature 35/40, pm10 danger 150, co 30/60) that are not used
//! here until product confirms which set is correct.

use crate::models::{Connectivity, Parameter, StatusTier};

// ---

/// Warning and danger cutoffs. Both are inclusive lower bounds, `warning < danger`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub danger: f64,
}

/// Everything the dashboard knows about a parameter statically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub parameter: Parameter,
    pub display_name: &'static str,
    pub unit: &'static str,
    pub thresholds: Thresholds,
}

/// Indexed by [`Parameter::index`].
static TABLE: [ParameterSpec; 7] = [
    ParameterSpec {
        parameter: Parameter::Temperature,
        display_name: "Nhiệt độ",
        unit: "°C",
        thresholds: Thresholds { warning: 30.0, danger: 33.0 },
    },
    ParameterSpec {
        parameter: Parameter::Humidity,
        display_name: "Độ ẩm",
        unit: "%",
        thresholds: Thresholds { warning: 70.0, danger: 85.0 },
    },
    ParameterSpec {
        parameter: Parameter::Pm10,
        display_name: "PM10",
        unit: "μg/m³",
        thresholds: Thresholds { warning: 50.0, danger: 100.0 },
    },
    ParameterSpec {
        parameter: Parameter::Pm25,
        display_name: "PM2.5",
        unit: "μg/m³",
        thresholds: Thresholds { warning: 25.0, danger: 50.0 },
    },
    ParameterSpec {
        parameter: Parameter::Co,
        display_name: "CO",
        unit: "ppm",
        thresholds: Thresholds { warning: 25.0, danger: 40.0 },
    },
    ParameterSpec {
        parameter: Parameter::Noise,
        display_name: "Tiếng ồn",
        unit: "dB",
        thresholds: Thresholds { warning: 70.0, danger: 85.0 },
    },
    ParameterSpec {
        parameter: Parameter::Aqi,
        display_name: "AQI",
        unit: "",
        thresholds: Thresholds { warning: 100.0, danger: 150.0 },
    },
];

pub fn spec(parameter: Parameter) -> &'static ParameterSpec {
    &TABLE[parameter.index()]
}

pub fn thresholds(parameter: Parameter) -> Thresholds {
    spec(parameter).thresholds
}

pub fn tier_label(tier: StatusTier) -> &'static str {
    // ---
    match tier {
        StatusTier::Normal => "Tốt",
        StatusTier::Warning => "Trung bình",
        StatusTier::Poor => "Kém",
        StatusTier::Danger => "Xấu",
        StatusTier::Offline => "Offline",
        StatusTier::Unknown => "Không xác định",
    }
}

pub fn connectivity_message(status: Connectivity) -> &'static str {
    // ---
    match status {
        Connectivity::Online => "Thiết bị đang hoạt động",
        Connectivity::Inactive => "Thiết bị không hoạt động trong thời gian ngắn",
        Connectivity::Offline => "Thiết bị ngừng hoạt động",
        Connectivity::Unknown => "Không xác định trạng thái thiết bị",
    }
}
