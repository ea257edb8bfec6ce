//! VN_AQI derivation (Decision 1459/QĐ-TCMT) from instantaneous readings.
//!
//! Telemetry devices publish PM2.5, PM10 and CO but no AQI. When the `aqi`
//! reading arrives empty, the index is derived here from whichever of the
//! three pollutants are present: the AQI is the largest sub-index.

use crate::classify;
use crate::models::{CurrentReadingSet, Parameter, Reading, StatusTier};

// ---

/// Linear segment of a sub-index table.
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    c_low: f64,
    c_high: f64,
    i_low: f64,
    i_high: f64,
}

const fn bp(c_low: f64, c_high: f64, i_low: f64, i_high: f64) -> Breakpoint {
    Breakpoint {
        c_low,
        c_high,
        i_low,
        i_high,
    }
}

/// PM2.5, µg/m³.
const PM25: [Breakpoint; 7] = [
    bp(0.0, 12.0, 0.0, 50.0),
    bp(12.1, 35.4, 51.0, 100.0),
    bp(35.5, 55.4, 101.0, 150.0),
    bp(55.5, 150.4, 151.0, 200.0),
    bp(150.5, 250.4, 201.0, 300.0),
    bp(250.5, 350.4, 301.0, 400.0),
    bp(350.5, 500.4, 401.0, 500.0),
];

/// PM10, µg/m³.
const PM10: [Breakpoint; 7] = [
    bp(0.0, 54.0, 0.0, 50.0),
    bp(55.0, 154.0, 51.0, 100.0),
    bp(155.0, 254.0, 101.0, 150.0),
    bp(255.0, 354.0, 151.0, 200.0),
    bp(355.0, 424.0, 201.0, 300.0),
    bp(425.0, 504.0, 301.0, 400.0),
    bp(505.0, 604.0, 401.0, 500.0),
];

/// CO, mg/m³.
const CO: [Breakpoint; 7] = [
    bp(0.0, 10.0, 0.0, 50.0),
    bp(10.1, 30.0, 51.0, 100.0),
    bp(30.1, 45.0, 101.0, 150.0),
    bp(45.1, 60.0, 151.0, 200.0),
    bp(60.1, 90.0, 201.0, 300.0),
    bp(90.1, 120.0, 301.0, 400.0),
    bp(120.1, 150.0, 401.0, 500.0),
];

/// CO ppm → mg/m³ at 25 °C and 1 atm.
pub const CO_PPM_TO_MGM3: f64 = 1.145;

/// Air-quality band of an index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiLevel {
    Good,
    Moderate,
    Poor,
    Bad,
    VeryBad,
    Hazardous,
}

impl AqiLevel {
    pub fn from_index(index: u16) -> AqiLevel {
        // ---
        match index {
            0..=50 => AqiLevel::Good,
            51..=100 => AqiLevel::Moderate,
            101..=150 => AqiLevel::Poor,
            151..=200 => AqiLevel::Bad,
            201..=300 => AqiLevel::VeryBad,
            _ => AqiLevel::Hazardous,
        }
    }

    pub fn label(self) -> &'static str {
        // ---
        match self {
            AqiLevel::Good => "Tốt",
            AqiLevel::Moderate => "Trung bình",
            AqiLevel::Poor => "Kém",
            AqiLevel::Bad => "Xấu",
            AqiLevel::VeryBad => "Rất xấu",
            AqiLevel::Hazardous => "Nguy hiểm",
        }
    }

    pub fn description(self) -> &'static str {
        // ---
        match self {
            AqiLevel::Good => "Chất lượng không khí tốt",
            AqiLevel::Moderate => "Chất lượng không khí trung bình",
            AqiLevel::Poor => "Nhóm nhạy cảm nên hạn chế thời gian ở ngoài trời",
            AqiLevel::Bad => "Nhóm nhạy cảm nên hạn chế ra ngoài",
            AqiLevel::VeryBad => "Nhóm nhạy cảm tránh ra ngoài trời",
            AqiLevel::Hazardous => "Mọi người nên ở trong nhà",
        }
    }
}

/// Sub-index of one pollutant. Above the table saturates at the top index;
/// values falling between two bands resolve to the lowest index.
fn sub_index(concentration: f64, table: &[Breakpoint]) -> Option<u16> {
    // ---
    if !concentration.is_finite() {
        return None;
    }

    if let Some(b) = table
        .iter()
        .find(|b| b.c_low <= concentration && concentration <= b.c_high)
    {
        let index = (b.i_high - b.i_low) / (b.c_high - b.c_low) * (concentration - b.c_low) + b.i_low;
        return Some(index.round() as u16);
    }

    match (table.first(), table.last()) {
        (_, Some(top)) if concentration > top.c_high => Some(top.i_high as u16),
        (Some(bottom), _) => Some(bottom.i_low as u16),
        _ => None,
    }
}

/// Overall index from PM2.5 (µg/m³), PM10 (µg/m³) and CO (ppm).
pub fn vn_aqi(pm25: Option<f64>, pm10: Option<f64>, co_ppm: Option<f64>) -> Option<u16> {
    // ---
    [
        pm25.and_then(|c| sub_index(c, &PM25)),
        pm10.and_then(|c| sub_index(c, &PM10)),
        co_ppm.and_then(|c| sub_index(c * CO_PPM_TO_MGM3, &CO)),
    ]
    .into_iter()
    .flatten()
    .max()
}

/// Derive an `aqi` reading when the set carries none. Returns `None` when the
/// set already has one, or no pollutant reading is available.
pub fn derive_reading(set: &CurrentReadingSet) -> Option<Reading> {
    // ---
    let current = set.get(Parameter::Aqi);
    if current.value.is_some() || current.status != StatusTier::Unknown {
        return None;
    }

    let sources: Vec<&Reading> = [Parameter::Pm25, Parameter::Pm10, Parameter::Co]
        .into_iter()
        .map(|p| set.get(p))
        .filter(|r| r.value.is_some())
        .collect();

    let index = vn_aqi(
        set.get(Parameter::Pm25).value,
        set.get(Parameter::Pm10).value,
        set.get(Parameter::Co).value,
    )?;

    let newest = sources.iter().max_by_key(|r| r.last_update)?;
    let value = f64::from(index);

    tracing::debug!(
        "Derived AQI {} ({}) from {} pollutant readings",
        index,
        AqiLevel::from_index(index).label(),
        sources.len()
    );

    Some(Reading {
        parameter: Parameter::Aqi,
        value: Some(value),
        unit: Parameter::Aqi.unit().to_string(),
        status: classify::classify(Parameter::Aqi, Some(value)),
        timestamp_label: newest.timestamp_label.clone(),
        last_update: newest.last_update,
    })
}

/// The set with a derived `aqi` reading filled in, when one can be derived.
pub fn with_derived_aqi(set: CurrentReadingSet) -> CurrentReadingSet {
    // ---
    match derive_reading(&set) {
        Some(reading) => set.with_reading(reading),
        None => set,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{Connectivity, DeviceStatus};

    fn set_with(readings: Vec<(Parameter, f64, Option<i64>)>) -> CurrentReadingSet {
        // ---
        let readings = readings.into_iter().map(|(parameter, value, last_update)| Reading {
            parameter,
            value: Some(value),
            unit: parameter.unit().to_string(),
            status: classify::classify(parameter, Some(value)),
            timestamp_label: format!("label-{}", last_update.unwrap_or_default()),
            last_update,
        });
        CurrentReadingSet::new(
            readings,
            DeviceStatus {
                status: Connectivity::Online,
                last_timestamp: None,
            },
            None,
            "now",
        )
    }

    #[test]
    fn test_sub_index_band_edges() {
        // ---
        assert_eq!(sub_index(0.0, &PM25), Some(0));
        assert_eq!(sub_index(12.0, &PM25), Some(50));
        assert_eq!(sub_index(35.4, &PM25), Some(100));
        assert_eq!(sub_index(500.4, &PM25), Some(500));
    }

    #[test]
    fn test_sub_index_interpolates() {
        // ---
        // (100 - 51) / (154 - 55) * (100 - 55) + 51 = 73.27
        assert_eq!(sub_index(100.0, &PM10), Some(73));
    }

    #[test]
    fn test_sub_index_out_of_table() {
        // ---
        assert_eq!(sub_index(900.0, &PM10), Some(500));
        // between the 12.0 and 12.1 bands
        assert_eq!(sub_index(12.05, &PM25), Some(0));
        assert_eq!(sub_index(f64::NAN, &PM25), None);
    }

    #[test]
    fn test_vn_aqi_takes_largest_sub_index() {
        // ---
        // pm25 12 → 50, pm10 100 → 73, co 10 ppm = 11.45 mg/m³ → 54
        assert_eq!(vn_aqi(Some(12.0), Some(100.0), Some(10.0)), Some(73));
        assert_eq!(vn_aqi(None, None, Some(10.0)), Some(54));
        assert_eq!(vn_aqi(None, None, None), None);
    }

    #[test]
    fn test_levels() {
        // ---
        assert_eq!(AqiLevel::from_index(50), AqiLevel::Good);
        assert_eq!(AqiLevel::from_index(120), AqiLevel::Poor);
        assert_eq!(AqiLevel::from_index(120).label(), "Kém");
        assert_eq!(AqiLevel::from_index(480), AqiLevel::Hazardous);
    }

    #[test]
    fn test_derived_reading_is_classified() {
        // ---
        // pm25 60 → (200-151)/(150.4-55.5)*(4.5)+151 = 153.3 → danger at 150
        let set = set_with(vec![(Parameter::Pm25, 60.0, Some(200)), (Parameter::Pm10, 40.0, Some(300))]);
        let filled = with_derived_aqi(set);

        let aqi = filled.get(Parameter::Aqi);
        assert_eq!(aqi.value, Some(153.0));
        assert_eq!(aqi.status, StatusTier::Danger);
        assert_eq!(aqi.last_update, Some(300));
        assert_eq!(aqi.timestamp_label, "label-300");
    }

    #[test]
    fn test_existing_aqi_is_not_overwritten() {
        // ---
        let set = set_with(vec![(Parameter::Aqi, 42.0, None), (Parameter::Pm25, 60.0, None)]);
        assert!(derive_reading(&set).is_none());
        assert_eq!(with_derived_aqi(set).get(Parameter::Aqi).value, Some(42.0));
    }

    #[test]
    fn test_no_pollutants_leaves_aqi_unknown() {
        // ---
        let set = set_with(vec![(Parameter::Temperature, 25.0, None)]);
        let filled = with_derived_aqi(set);
        assert_eq!(filled.get(Parameter::Aqi).status, StatusTier::Unknown);
    }
}
