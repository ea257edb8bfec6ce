//! Normalized data model shared by every dashboard surface.
//!
//! Everything here is rebuilt on each poll cycle and never mutated in place:
//! a new [`CurrentReadingSet`] replaces the previous one wholesale.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::UnknownParameter;
use crate::thresholds;

// ---

/// One monitored environmental quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Temperature,
    Humidity,
    Pm10,
    Pm25,
    Co,
    Noise,
    Aqi,
}

impl Parameter {
    /// Every parameter, in canonical (storage) order.
    pub const ALL: [Parameter; 7] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::Pm10,
        Parameter::Pm25,
        Parameter::Co,
        Parameter::Noise,
        Parameter::Aqi,
    ];

    /// Order in which parameter cards are shown to the user.
    pub const DISPLAY_ORDER: [Parameter; 7] = [
        Parameter::Aqi,
        Parameter::Pm25,
        Parameter::Pm10,
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::Co,
        Parameter::Noise,
    ];

    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::Pm10 => "pm10",
            Parameter::Pm25 => "pm25",
            Parameter::Co => "co",
            Parameter::Noise => "noise",
            Parameter::Aqi => "aqi",
        }
    }

    /// Position in [`Parameter::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolve an upstream key, including the telemetry aliases a device may
    /// publish under (`Temperature`, `PM2.5`, `Sound`, ...).
    pub fn from_key(key: &str) -> Option<Parameter> {
        // ---
        match key.trim().to_ascii_lowercase().as_str() {
            "temperature" => Some(Parameter::Temperature),
            "humidity" => Some(Parameter::Humidity),
            "pm10" => Some(Parameter::Pm10),
            "pm25" | "pm2.5" | "pm2_5" => Some(Parameter::Pm25),
            "co" => Some(Parameter::Co),
            "noise" | "sound" => Some(Parameter::Noise),
            "aqi" => Some(Parameter::Aqi),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        thresholds::spec(self).display_name
    }

    pub fn unit(self) -> &'static str {
        thresholds::spec(self).unit
    }
}

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::from_key(s).ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity classification of a reading.
///
/// `Offline` and `Unknown` mean "no valid measurement" and have no rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTier {
    Normal,
    Warning,
    #[serde(alias = "kém")]
    Poor,
    Danger,
    Offline,
    Unknown,
}

impl StatusTier {
    /// Lenient parse of an upstream status literal. Anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> StatusTier {
        // ---
        match s.trim().to_lowercase().as_str() {
            "normal" => StatusTier::Normal,
            "warning" => StatusTier::Warning,
            "poor" | "kém" => StatusTier::Poor,
            "danger" => StatusTier::Danger,
            "offline" => StatusTier::Offline,
            _ => StatusTier::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            StatusTier::Normal => "normal",
            StatusTier::Warning => "warning",
            StatusTier::Poor => "poor",
            StatusTier::Danger => "danger",
            StatusTier::Offline => "offline",
            StatusTier::Unknown => "unknown",
        }
    }

    /// Rank for severity comparisons: normal < warning < poor < danger.
    pub fn severity(self) -> Option<u8> {
        // ---
        match self {
            StatusTier::Normal => Some(0),
            StatusTier::Warning => Some(1),
            StatusTier::Poor => Some(2),
            StatusTier::Danger => Some(3),
            StatusTier::Offline | StatusTier::Unknown => None,
        }
    }

    pub fn is_warning_or_above(self) -> bool {
        self.severity().is_some_and(|s| s >= 1)
    }

    pub fn is_danger(self) -> bool {
        self == StatusTier::Danger
    }

    /// Localized label shown to the user.
    pub fn label(self) -> &'static str {
        thresholds::tier_label(self)
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parameter's current value.
///
/// Serializes to the backend wire form (`value`, `unit`, `status`,
/// `timestamp`, `last_update`); the parameter itself is the enclosing key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    // ---
    #[serde(skip_serializing)]
    pub parameter: Parameter,
    pub value: Option<f64>,
    pub unit: String,
    pub status: StatusTier,
    #[serde(rename = "timestamp")]
    pub timestamp_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

impl Reading {
    /// Placeholder for a parameter the upstream said nothing about.
    pub fn unknown(parameter: Parameter, timestamp_label: impl Into<String>) -> Self {
        // ---
        Reading {
            parameter,
            value: None,
            unit: parameter.unit().to_string(),
            status: StatusTier::Unknown,
            timestamp_label: timestamp_label.into(),
            last_update: None,
        }
    }
}

/// Connectivity classification of the monitoring device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Inactive,
    Offline,
    Unknown,
}

impl Connectivity {
    /// Lenient parse; unrecognised literals are `Unknown`.
    pub fn parse(s: &str) -> Connectivity {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Connectivity::Online,
            "inactive" => Connectivity::Inactive,
            "offline" => Connectivity::Offline,
            _ => Connectivity::Unknown,
        }
    }
}

/// Derived device connectivity. Built only by [`crate::classify::device_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub status: Connectivity,
    pub last_timestamp: Option<i64>,
}

impl DeviceStatus {
    pub fn message(&self) -> &'static str {
        thresholds::connectivity_message(self.status)
    }

    /// Relative "last updated" text for the status bar.
    pub fn last_update_text(&self, now: DateTime<Utc>, offset: &FixedOffset) -> String {
        // ---
        let Some(last) = self.last_timestamp else {
            return "Không có dữ liệu".to_string();
        };

        let diff_ms = now.timestamp_millis() - last;
        let minutes = diff_ms / 60_000;

        if diff_ms < 60_000 {
            "Vừa cập nhật".to_string()
        } else if minutes < 60 {
            format!("{} phút trước", minutes)
        } else if minutes < 24 * 60 {
            format!("{} giờ trước", minutes / 60)
        } else {
            match DateTime::<Utc>::from_timestamp_millis(last) {
                Some(at) => format!(
                    "Lần cuối: {}",
                    at.with_timezone(offset).format("%d/%m/%Y %H:%M")
                ),
                None => "Không có dữ liệu".to_string(),
            }
        }
    }
}

/// Full snapshot of every parameter's current reading plus device connectivity.
///
/// Holds exactly one [`Reading`] per [`Parameter`]; missing upstream data is
/// filled with an `unknown` reading at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentReadingSet {
    // ---
    readings: [Reading; 7],
    device: DeviceStatus,
    last_data_timestamp: Option<i64>,
}

impl CurrentReadingSet {
    pub fn new(
        readings: impl IntoIterator<Item = Reading>,
        device: DeviceStatus,
        last_data_timestamp: Option<i64>,
        fallback_label: &str,
    ) -> Self {
        // ---
        let mut slots: [Option<Reading>; 7] = Default::default();
        for reading in readings {
            let index = reading.parameter.index();
            slots[index] = Some(reading);
        }

        let readings = Parameter::ALL.map(|p| {
            slots[p.index()]
                .take()
                .unwrap_or_else(|| Reading::unknown(p, fallback_label))
        });

        CurrentReadingSet {
            readings,
            device,
            last_data_timestamp,
        }
    }

    pub fn get(&self, parameter: Parameter) -> &Reading {
        &self.readings[parameter.index()]
    }

    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn device_status(&self) -> &DeviceStatus {
        &self.device
    }

    pub fn last_data_timestamp(&self) -> Option<i64> {
        self.last_data_timestamp
    }

    /// A copy of this set with one reading replaced.
    pub fn with_reading(&self, reading: Reading) -> Self {
        // ---
        let mut next = self.clone();
        let index = reading.parameter.index();
        next.readings[index] = reading;
        next
    }

    pub fn has_any_warning(&self) -> bool {
        self.readings.iter().any(|r| r.status.is_warning_or_above())
    }

    pub fn has_any_danger(&self) -> bool {
        self.readings.iter().any(|r| r.status.is_danger())
    }

    /// Display cards in the order the dashboard lists them.
    pub fn cards(&self) -> Vec<ParameterCard> {
        // ---
        Parameter::DISPLAY_ORDER
            .iter()
            .map(|&p| {
                let reading = self.get(p);
                ParameterCard {
                    id: p,
                    name: p.display_name(),
                    value: reading.value,
                    unit: reading.unit.clone(),
                    status: reading.status,
                    status_text: reading.status.label(),
                }
            })
            .collect()
    }
}

/// Backend wire form: `{ "data": { <param>: <reading>, ... }, "device_status", "last_data_timestamp" }`.
impl Serialize for CurrentReadingSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // ---
        #[derive(Serialize)]
        struct Wire<'a> {
            data: ReadingMap<'a>,
            device_status: Connectivity,
            last_data_timestamp: Option<i64>,
        }

        struct ReadingMap<'a>(&'a [Reading; 7]);

        impl Serialize for ReadingMap<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for reading in self.0 {
                    map.serialize_entry(reading.parameter.as_str(), reading)?;
                }
                map.end()
            }
        }

        Wire {
            data: ReadingMap(&self.readings),
            device_status: self.device.status,
            last_data_timestamp: self.last_data_timestamp,
        }
        .serialize(serializer)
    }
}

/// One card in the dashboard list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterCard {
    pub id: Parameter,
    pub name: &'static str,
    pub value: Option<f64>,
    pub unit: String,
    pub status: StatusTier,
    pub status_text: &'static str,
}

/// One point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    #[serde(rename = "timestamp")]
    pub timestamp_label: String,
    pub value: f64,
    /// Acquisition time, when the upstream supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

/// Per-parameter chart series; every parameter is present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalSeriesSet {
    series: [Vec<HistoricalPoint>; 7],
}

impl HistoricalSeriesSet {
    /// A later entry for the same parameter replaces an earlier one.
    pub fn new(series: impl IntoIterator<Item = (Parameter, Vec<HistoricalPoint>)>) -> Self {
        // ---
        let mut set = HistoricalSeriesSet::default();
        for (parameter, points) in series {
            set.series[parameter.index()] = points;
        }
        set
    }

    pub fn get(&self, parameter: Parameter) -> &[HistoricalPoint] {
        &self.series[parameter.index()]
    }

    /// Stable ascending sort of every series by `ts`; points without one
    /// keep their relative order at the front.
    pub(crate) fn sort_by_acquisition_time(&mut self) {
        // ---
        for points in self.series.iter_mut() {
            points.sort_by_key(|p| p.ts);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, &[HistoricalPoint])> {
        Parameter::ALL
            .iter()
            .map(move |&p| (p, self.series[p.index()].as_slice()))
    }
}

impl Serialize for HistoricalSeriesSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // ---
        let mut map = serializer.serialize_map(Some(self.series.len()))?;
        for (parameter, points) in self.iter() {
            map.serialize_entry(parameter.as_str(), points)?;
        }
        map.end()
    }
}

/// Chart lookback windows offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookbackWindow {
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
    OneDay,
}

impl LookbackWindow {
    pub const ALL: [LookbackWindow; 5] = [
        LookbackWindow::OneHour,
        LookbackWindow::ThreeHours,
        LookbackWindow::SixHours,
        LookbackWindow::TwelveHours,
        LookbackWindow::OneDay,
    ];

    pub fn from_hours(hours: u32) -> Option<LookbackWindow> {
        LookbackWindow::ALL.into_iter().find(|w| w.hours() == hours)
    }

    pub fn hours(self) -> u32 {
        // ---
        match self {
            LookbackWindow::OneHour => 1,
            LookbackWindow::ThreeHours => 3,
            LookbackWindow::SixHours => 6,
            LookbackWindow::TwelveHours => 12,
            LookbackWindow::OneDay => 24,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn millis(self) -> i64 {
        i64::from(self.hours()) * 60 * 60 * 1000
    }
}
