//! Payload normalization: upstream JSON in, [`CurrentReadingSet`] /
//! [`HistoricalSeriesSet`] out.
//!
//! Two upstream shapes are understood:
//! - **backend**: `{ "data": { <param>: { value, unit, status, timestamp, last_update } },
//!   "device_status", "last_data_timestamp" }`, plus `{ <param>: [{ timestamp, value }] }`
//!   for history.
//! - **telemetry** (ThingsBoard): `{ <key>: [{ "ts": <millis>, "value": "<number>" }, ...] }`,
//!   newest element first for the current snapshot, unordered for history.
//!
//! Keys outside the parameter set are skipped. Any other shape problem fails the
//! whole payload with [`NormalizeError::MalformedPayload`]; nothing partial is returned.

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::classify;
use crate::error::NormalizeError;
use crate::models::{
    Connectivity, CurrentReadingSet, HistoricalPoint, HistoricalSeriesSet, Parameter, Reading,
    StatusTier,
};

// ---

type Result<T> = std::result::Result<T, NormalizeError>;

/// Converts upstream payloads into the normalized model.
///
/// Holds only the display offset used to render timestamp labels.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    offset: FixedOffset,
}

impl Normalizer {
    pub fn new(offset: FixedOffset) -> Self {
        Normalizer { offset }
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    /// `HH:MM:SS` label for a wall-clock instant.
    pub fn time_label(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%H:%M:%S").to_string()
    }

    /// `HH:MM` chart label for an epoch-millis acquisition time.
    fn chart_label(&self, ts: i64, context: &str) -> Result<String> {
        // ---
        let at = DateTime::<Utc>::from_timestamp_millis(ts)
            .ok_or_else(|| NormalizeError::malformed(context, format!("timestamp {ts} out of range")))?;
        Ok(at.with_timezone(&self.offset).format("%H:%M").to_string())
    }

    // --- backend shape

    /// Normalize a backend `/api/current` payload.
    pub fn current_from_backend(&self, payload: &Value, now: DateTime<Utc>) -> Result<CurrentReadingSet> {
        // ---
        let root = as_object(payload, "$")?;
        let data = as_object(
            root.get("data")
                .ok_or_else(|| NormalizeError::malformed("$", "missing `data`"))?,
            "data",
        )?;

        let fallback_label = self.time_label(now);
        let mut readings = Vec::with_capacity(Parameter::ALL.len());

        for (key, entry) in data {
            let Some(parameter) = Parameter::from_key(key) else {
                debug!("Skipping non-parameter key `data.{}`", key);
                continue;
            };
            let context = format!("data.{key}");
            keep_newer(&mut readings, self.backend_reading(parameter, entry, &context, &fallback_label)?);
        }

        // Device fields live at top level; older backends nested them in `data`.
        let device_field = |name: &str| root.get(name).or_else(|| data.get(name));

        let explicit = match device_field("device_status") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(Connectivity::parse(s)),
            Some(_) => {
                return Err(NormalizeError::malformed("device_status", "expected a string"));
            }
        };
        let last_data_timestamp = match device_field("last_data_timestamp") {
            None => None,
            Some(v) => epoch_millis(v, "last_data_timestamp")?,
        };

        let device = classify::device_status(explicit, last_data_timestamp, now);

        Ok(CurrentReadingSet::new(
            readings,
            device,
            last_data_timestamp,
            &fallback_label,
        ))
    }

    fn backend_reading(
        &self,
        parameter: Parameter,
        entry: &Value,
        context: &str,
        fallback_label: &str,
    ) -> Result<Reading> {
        // ---
        let fields = as_object(entry, context)?;

        let value = match fields.get("value") {
            None => None,
            Some(v) => number(v, &format!("{context}.value"))?,
        };

        let unit = match fields.get("unit") {
            None | Some(Value::Null) => parameter.unit().to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(NormalizeError::malformed(format!("{context}.unit"), "expected a string")),
        };

        let upstream_status = match fields.get("status") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(StatusTier::parse(s)),
            Some(_) => {
                return Err(NormalizeError::malformed(format!("{context}.status"), "expected a string"));
            }
        };

        let timestamp_label = match fields.get("timestamp") {
            None | Some(Value::Null) => fallback_label.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(NormalizeError::malformed(format!("{context}.timestamp"), "expected a string"));
            }
        };

        let last_update = match fields.get("last_update") {
            None => None,
            Some(v) => epoch_millis(v, &format!("{context}.last_update"))?,
        };

        Ok(Reading {
            parameter,
            value,
            unit,
            status: classify::resolve(parameter, value, upstream_status),
            timestamp_label,
            last_update,
        })
    }

    /// Normalize a backend `/api/historical` payload. Source order is kept.
    pub fn historical_from_backend(&self, payload: &Value) -> Result<HistoricalSeriesSet> {
        // ---
        let root = as_object(payload, "$")?;
        let mut series = Vec::with_capacity(Parameter::ALL.len());

        for (key, points) in root {
            let Some(parameter) = Parameter::from_key(key) else {
                debug!("Skipping non-parameter history key `{}`", key);
                continue;
            };
            let points = self.series_from_backend(points, key)?;
            keep_newer_series(&mut series, parameter, points);
        }

        Ok(HistoricalSeriesSet::new(series))
    }

    /// Normalize one backend series (`/api/historical/{param}`).
    pub fn series_from_backend(&self, payload: &Value, context: &str) -> Result<Vec<HistoricalPoint>> {
        // ---
        as_array(payload, context)?
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let context = format!("{context}[{i}]");
                let fields = as_object(point, &context)?;

                let timestamp_label = match fields.get("timestamp") {
                    Some(Value::String(s)) => s.clone(),
                    _ => {
                        return Err(NormalizeError::malformed(
                            format!("{context}.timestamp"),
                            "expected a string label",
                        ));
                    }
                };
                let value = required_number(fields.get("value"), &format!("{context}.value"))?;
                let ts = match fields.get("ts") {
                    None => None,
                    Some(v) => epoch_millis(v, &format!("{context}.ts"))?,
                };

                Ok(HistoricalPoint {
                    timestamp_label,
                    value,
                    ts,
                })
            })
            .collect()
    }

    // --- telemetry shape

    /// Normalize a telemetry latest-values payload.
    ///
    /// Labels carry the time of normalization, not the device capture time;
    /// the capture time is kept in `last_update` and drives device status.
    pub fn current_from_telemetry(&self, payload: &Value, now: DateTime<Utc>) -> Result<CurrentReadingSet> {
        // ---
        let root = as_object(payload, "$")?;
        let label = self.time_label(now);
        let mut readings: Vec<Reading> = Vec::with_capacity(Parameter::ALL.len());

        for (key, samples) in root {
            let Some(parameter) = Parameter::from_key(key) else {
                debug!("Skipping unknown telemetry key `{}`", key);
                continue;
            };

            let Some(latest) = as_array(samples, key)?.first() else {
                debug!("Telemetry key `{}` has no samples", key);
                continue;
            };

            let (ts, value) = telemetry_sample(latest, &format!("{key}[0]"))?;
            let reading = Reading {
                parameter,
                value: Some(value),
                unit: parameter.unit().to_string(),
                status: classify::classify(parameter, Some(value)),
                timestamp_label: label.clone(),
                last_update: Some(ts),
            };

            keep_newer(&mut readings, reading);
        }

        let last_data_timestamp = readings.iter().filter_map(|r| r.last_update).max();
        let device = classify::device_status(None, last_data_timestamp, now);

        Ok(CurrentReadingSet::new(readings, device, last_data_timestamp, &label))
    }

    /// Normalize a telemetry time-series payload, sorting every series by
    /// acquisition time.
    pub fn historical_from_telemetry(&self, payload: &Value) -> Result<HistoricalSeriesSet> {
        // ---
        let root = as_object(payload, "$")?;
        let mut series: Vec<(Parameter, Vec<HistoricalPoint>)> = Vec::new();

        for (key, samples) in root {
            let Some(parameter) = Parameter::from_key(key) else {
                debug!("Skipping unknown telemetry key `{}`", key);
                continue;
            };

            let points = as_array(samples, key)?
                .iter()
                .enumerate()
                .map(|(i, sample)| {
                    let context = format!("{key}[{i}]");
                    let (ts, value) = telemetry_sample(sample, &context)?;
                    Ok(HistoricalPoint {
                        timestamp_label: self.chart_label(ts, &context)?,
                        value,
                        ts: Some(ts),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            keep_newer_series(&mut series, parameter, points);
        }

        let mut set = HistoricalSeriesSet::new(series);
        set.sort_by_acquisition_time();
        Ok(set)
    }
}

// ---

/// One reading per parameter. When two keys alias the same parameter the
/// one with the newer `last_update` wins; on a tie the first seen stays.
fn keep_newer(readings: &mut Vec<Reading>, reading: Reading) {
    // ---
    match readings.iter().position(|r| r.parameter == reading.parameter) {
        Some(i) if readings[i].last_update < reading.last_update => readings[i] = reading,
        Some(_) => debug!("Dropping older duplicate reading for `{}`", reading.parameter),
        None => readings.push(reading),
    }
}

fn newest_ts(points: &[HistoricalPoint]) -> Option<i64> {
    points.iter().filter_map(|p| p.ts).max()
}

/// One series per parameter, by the same rule as [`keep_newer`]: the series
/// whose latest point is newer wins.
fn keep_newer_series(
    series: &mut Vec<(Parameter, Vec<HistoricalPoint>)>,
    parameter: Parameter,
    points: Vec<HistoricalPoint>,
) {
    // ---
    match series.iter().position(|(p, _)| *p == parameter) {
        Some(i) if newest_ts(&series[i].1) < newest_ts(&points) => series[i].1 = points,
        Some(_) => debug!("Dropping older duplicate series for `{}`", parameter),
        None => series.push((parameter, points)),
    }
}

fn as_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| NormalizeError::malformed(context, format!("expected an object, got {}", kind(value))))
}

fn as_array<'a>(value: &'a Value, context: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| NormalizeError::malformed(context, format!("expected an array, got {}", kind(value))))
}

/// A number, a numeric string, or `null` (no data).
fn number(value: &Value, context: &str) -> Result<Option<f64>> {
    // ---
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| NormalizeError::malformed(context, "number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| NormalizeError::malformed(context, format!("`{s}` is not numeric"))),
        other => Err(NormalizeError::malformed(
            context,
            format!("expected a number, got {}", kind(other)),
        )),
    }
}

fn required_number(value: Option<&Value>, context: &str) -> Result<f64> {
    value
        .map(|v| number(v, context))
        .transpose()?
        .flatten()
        .ok_or_else(|| NormalizeError::malformed(context, "missing value"))
}

/// Epoch milliseconds as an integer, integral float or numeric string; `null` is absent.
fn epoch_millis(value: &Value, context: &str) -> Result<Option<i64>> {
    // ---
    if let Some(ms) = value.as_i64() {
        return Ok(Some(ms));
    }
    match number(value, context)? {
        None => Ok(None),
        Some(ms) if ms.fract() == 0.0 && ms.abs() < i64::MAX as f64 => Ok(Some(ms as i64)),
        Some(ms) => Err(NormalizeError::malformed(context, format!("{ms} is not an epoch-millis integer"))),
    }
}

fn telemetry_sample(sample: &Value, context: &str) -> Result<(i64, f64)> {
    // ---
    let fields = as_object(sample, context)?;
    let ts = fields
        .get("ts")
        .map(|v| epoch_millis(v, &format!("{context}.ts")))
        .transpose()?
        .flatten()
        .ok_or_else(|| NormalizeError::malformed(format!("{context}.ts"), "missing timestamp"))?;
    let value = required_number(fields.get("value"), &format!("{context}.value"))?;
    Ok((ts, value))
}

fn kind(value: &Value) -> &'static str {
    // ---
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn normalizer() -> Normalizer {
        Normalizer::new(FixedOffset::east_opt(7 * 3600).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, 5, 30, 15).unwrap()
    }

    fn minutes_ago(minutes: i64) -> i64 {
        now().timestamp_millis() - minutes * 60_000
    }

    fn backend_entry(value: f64, status: &str) -> Value {
        json!({ "value": value, "unit": "x", "status": status, "timestamp": "12:30:00" })
    }

    #[test]
    fn test_backend_device_status_from_timestamp() {
        // ---
        for (minutes, expected) in [
            (10, Connectivity::Online),
            (40, Connectivity::Inactive),
            (90, Connectivity::Offline),
        ] {
            let payload = json!({ "data": {}, "last_data_timestamp": minutes_ago(minutes) });
            let set = normalizer().current_from_backend(&payload, now()).unwrap();
            assert_eq!(set.device_status().status, expected, "{minutes} minutes");
        }
    }

    #[test]
    fn test_backend_explicit_device_status_is_kept() {
        // ---
        let payload = json!({
            "data": {},
            "device_status": "offline",
            "last_data_timestamp": minutes_ago(1),
        });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();
        assert_eq!(set.device_status().status, Connectivity::Offline);
        assert_eq!(set.last_data_timestamp(), Some(minutes_ago(1)));
    }

    #[test]
    fn test_backend_device_fields_nested_in_data() {
        // ---
        let payload = json!({
            "data": {
                "temperature": backend_entry(25.0, "normal"),
                "device_status": "unknown",
                "last_data_timestamp": minutes_ago(20),
            }
        });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();
        assert_eq!(set.device_status().status, Connectivity::Inactive);
    }

    #[test]
    fn test_backend_missing_parameters_become_unknown() {
        // ---
        let payload = json!({
            "data": {
                "temperature": backend_entry(25.0, "normal"),
                "humidity": backend_entry(60.0, "normal"),
            }
        });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();

        assert_eq!(set.readings().count(), 7);
        for p in [Parameter::Pm10, Parameter::Pm25, Parameter::Co, Parameter::Noise, Parameter::Aqi] {
            let r = set.get(p);
            assert_eq!(r.status, StatusTier::Unknown, "{p}");
            assert_eq!(r.value, None, "{p}");
        }
        assert_eq!(set.get(Parameter::Temperature).value, Some(25.0));
        assert_eq!(set.device_status().status, Connectivity::Unknown);
    }

    #[test]
    fn test_backend_status_recomputed_when_absent_or_unknown() {
        // ---
        let payload = json!({
            "data": {
                "pm25": { "value": 60.0, "status": "unknown" },
                "co": { "value": 30 },
                "noise": { "value": 50.0, "status": "kém" },
            }
        });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();

        assert_eq!(set.get(Parameter::Pm25).status, StatusTier::Danger);
        assert_eq!(set.get(Parameter::Co).status, StatusTier::Warning);
        assert_eq!(set.get(Parameter::Co).unit, "ppm");
        assert_eq!(set.get(Parameter::Noise).status, StatusTier::Poor);
        // no label upstream: time of normalization at UTC+7
        assert_eq!(set.get(Parameter::Co).timestamp_label, "12:30:15");
    }

    #[test]
    fn test_backend_message_only_entry_has_no_value() {
        // ---
        let payload = json!({ "data": { "aqi": { "message": "no data" } } });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();
        let aqi = set.get(Parameter::Aqi);
        assert_eq!(aqi.value, None);
        assert_eq!(aqi.status, StatusTier::Unknown);
    }

    #[test]
    fn test_backend_round_trip_preserves_explicit_status() {
        // ---
        // Every status here disagrees with what the classifier would say.
        let payload = json!({
            "data": {
                "temperature": backend_entry(10.0, "danger"),
                "humidity": backend_entry(99.0, "normal"),
                "pm10": backend_entry(10.0, "kém"),
                "pm25": backend_entry(10.0, "warning"),
                "co": backend_entry(1.0, "offline"),
                "noise": backend_entry(90.0, "warning"),
                "aqi": backend_entry(10.0, "poor"),
            },
            "device_status": "online",
            "last_data_timestamp": minutes_ago(100),
        });

        let first = normalizer().current_from_backend(&payload, now()).unwrap();
        let wire = serde_json::to_value(&first).unwrap();
        let second = normalizer().current_from_backend(&wire, now()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.get(Parameter::Temperature).status, StatusTier::Danger);
        assert_eq!(second.get(Parameter::Humidity).status, StatusTier::Normal);
        assert_eq!(second.get(Parameter::Pm10).status, StatusTier::Poor);
        assert_eq!(second.get(Parameter::Co).status, StatusTier::Offline);
        assert_eq!(second.device_status().status, Connectivity::Online);
    }

    #[test]
    fn test_backend_non_numeric_value_is_malformed() {
        // ---
        let payload = json!({ "data": { "temperature": { "value": "hot", "status": "normal" } } });
        let err = normalizer().current_from_backend(&payload, now()).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::MalformedPayload { ref context, .. } if context == "data.temperature.value"
        ));
    }

    #[test]
    fn test_backend_numeric_string_is_accepted() {
        // ---
        let payload = json!({ "data": { "humidity": { "value": "71.5" } } });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();
        assert_eq!(set.get(Parameter::Humidity).value, Some(71.5));
        assert_eq!(set.get(Parameter::Humidity).status, StatusTier::Warning);
    }

    #[test]
    fn test_backend_wrong_shapes_are_malformed() {
        // ---
        let n = normalizer();
        assert!(n.current_from_backend(&json!([]), now()).is_err());
        assert!(n.current_from_backend(&json!({ "readings": {} }), now()).is_err());
        assert!(n.current_from_backend(&json!({ "data": [] }), now()).is_err());
        assert!(n
            .current_from_backend(&json!({ "data": { "co": 12 } }), now())
            .is_err());
        assert!(n
            .current_from_backend(&json!({ "data": {}, "last_data_timestamp": "yesterday" }), now())
            .is_err());
    }

    #[test]
    fn test_backend_historical_keeps_order_and_fills_keys() {
        // ---
        let payload = json!({
            "temperature": [
                { "timestamp": "10:02", "value": 25.0 },
                { "timestamp": "10:01", "value": 26.0 },
            ],
            "co2": [{ "timestamp": "10:00", "value": 400.0 }],
        });
        let set = normalizer().historical_from_backend(&payload).unwrap();

        let labels: Vec<_> = set
            .get(Parameter::Temperature)
            .iter()
            .map(|p| p.timestamp_label.as_str())
            .collect();
        assert_eq!(labels, ["10:02", "10:01"]);
        assert_eq!(set.iter().count(), 7);
        assert!(set.get(Parameter::Noise).is_empty());
    }

    #[test]
    fn test_backend_alias_collision_keeps_newer_reading() {
        // ---
        let payload = json!({
            "data": {
                "PM2.5": { "value": 12.0, "last_update": minutes_ago(1) },
                "pm25": { "value": 40.0, "last_update": minutes_ago(9) },
            }
        });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();
        assert_eq!(set.get(Parameter::Pm25).value, Some(12.0));

        // the other way round, so map order cannot decide
        let payload = json!({
            "data": {
                "PM2.5": { "value": 12.0, "last_update": minutes_ago(9) },
                "pm25": { "value": 40.0, "last_update": minutes_ago(1) },
            }
        });
        let set = normalizer().current_from_backend(&payload, now()).unwrap();
        assert_eq!(set.get(Parameter::Pm25).value, Some(40.0));
    }

    #[test]
    fn test_backend_history_alias_collision_is_not_concatenated() {
        // ---
        let payload = json!({
            "sound": [{ "timestamp": "10:00", "value": 50.0, "ts": 100 }],
            "noise": [
                { "timestamp": "10:01", "value": 55.0, "ts": 200 },
                { "timestamp": "10:02", "value": 57.0, "ts": 300 },
            ],
        });
        let set = normalizer().historical_from_backend(&payload).unwrap();

        let values: Vec<_> = set.get(Parameter::Noise).iter().map(|p| p.value).collect();
        assert_eq!(values, [55.0, 57.0]);
    }

    #[test]
    fn test_backend_series_missing_value_is_malformed() {
        // ---
        let payload = json!([{ "timestamp": "10:00" }]);
        assert!(normalizer().series_from_backend(&payload, "pm10").is_err());
    }

    #[test]
    fn test_telemetry_current_takes_first_sample() {
        // ---
        let payload = json!({
            "temperature": [
                { "ts": minutes_ago(2), "value": "31.5" },
                { "ts": minutes_ago(5), "value": "20.0" },
            ],
            "PM2.5": [{ "ts": minutes_ago(3), "value": 12 }],
            "co2": [{ "ts": minutes_ago(1), "value": "800" }],
        });
        let set = normalizer().current_from_telemetry(&payload, now()).unwrap();

        let temp = set.get(Parameter::Temperature);
        assert_eq!(temp.value, Some(31.5));
        assert_eq!(temp.status, StatusTier::Warning);
        assert_eq!(temp.unit, "°C");
        assert_eq!(temp.timestamp_label, "12:30:15");
        assert_eq!(temp.last_update, Some(minutes_ago(2)));

        assert_eq!(set.get(Parameter::Pm25).value, Some(12.0));
        assert_eq!(set.get(Parameter::Noise).status, StatusTier::Unknown);

        // co2 is dropped; newest known sample drives device status
        assert_eq!(set.last_data_timestamp(), Some(minutes_ago(2)));
        assert_eq!(set.device_status().status, Connectivity::Online);
    }

    #[test]
    fn test_telemetry_empty_sample_list_is_unknown() {
        // ---
        let payload = json!({ "humidity": [] });
        let set = normalizer().current_from_telemetry(&payload, now()).unwrap();
        assert_eq!(set.get(Parameter::Humidity).status, StatusTier::Unknown);
        assert_eq!(set.device_status().status, Connectivity::Unknown);
    }

    #[test]
    fn test_telemetry_bad_value_is_malformed() {
        // ---
        let payload = json!({ "noise": [{ "ts": 1, "value": "loud" }] });
        assert!(normalizer().current_from_telemetry(&payload, now()).is_err());

        let payload = json!({ "noise": [{ "value": "50" }] });
        assert!(normalizer().current_from_telemetry(&payload, now()).is_err());

        let payload = json!({ "noise": { "ts": 1, "value": "50" } });
        assert!(normalizer().current_from_telemetry(&payload, now()).is_err());
    }

    #[test]
    fn test_telemetry_history_is_sorted_ascending() {
        // ---
        let payload = json!({
            "pm10": [
                { "ts": 200, "value": "2" },
                { "ts": 100, "value": "1" },
                { "ts": 300, "value": "3" },
            ]
        });
        let set = normalizer().historical_from_telemetry(&payload).unwrap();

        let ts: Vec<_> = set.get(Parameter::Pm10).iter().map(|p| p.ts.unwrap()).collect();
        assert_eq!(ts, [100, 200, 300]);
        let values: Vec<_> = set.get(Parameter::Pm10).iter().map(|p| p.value).collect();
        assert_eq!(values, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_telemetry_history_alias_collision_keeps_newer_series() {
        // ---
        let payload = json!({
            "PM2.5": [
                { "ts": 500, "value": "30" },
                { "ts": 400, "value": "20" },
            ],
            "pm25": [{ "ts": 100, "value": "10" }],
        });
        let set = normalizer().historical_from_telemetry(&payload).unwrap();

        let ts: Vec<_> = set.get(Parameter::Pm25).iter().filter_map(|p| p.ts).collect();
        assert_eq!(ts, [400, 500]);
    }

    #[test]
    fn test_telemetry_history_labels_and_missing_keys() {
        // ---
        let ts = Utc.with_ymd_and_hms(2025, 3, 26, 1, 5, 0).unwrap().timestamp_millis();
        let payload = json!({
            "Sound": [{ "ts": ts, "value": "55" }],
            "unknown_key": [{ "ts": ts, "value": "1" }],
        });
        let set = normalizer().historical_from_telemetry(&payload).unwrap();

        assert_eq!(set.get(Parameter::Noise)[0].timestamp_label, "08:05");
        for p in Parameter::ALL.into_iter().filter(|p| *p != Parameter::Noise) {
            assert!(set.get(p).is_empty(), "{p}");
        }

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 7);
        assert_eq!(json["aqi"], json!([]));
    }
}
