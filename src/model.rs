/// LocationReading, Sensor, Reading, Alert, DashboardStats, ApiError
/// core data structures shared by the map, dashboard and sensor views.
///
/// Core data types for the Flowra drainage monitoring dashboard.
///
/// This module defines the shared domain model imported by all other modules.
/// The types mirror the JSON shapes served by the Flowra backend; anything the
/// backend may omit is an `Option` here so that absence is a typed case at the
/// network boundary rather than a runtime guess.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Map readings
// ---------------------------------------------------------------------------

/// One sensor's last known state, as shown by a pin on the map.
///
/// Corresponds to one entry of the `locations` array returned by
/// `GET /api/drainage-locations`. Ad hoc pins entered by an operator use the
/// same type (see `custom_pin`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    /// Sensor identifier. Absent for ad hoc pins that were not given one.
    #[serde(rename = "sensor_id", alias = "id", default)]
    pub id: Option<String>,
    /// WGS84 latitude, expected in [-90, 90]. NaN when the backend sent
    /// none; such a reading is kept but cannot be placed on the map.
    #[serde(default = "unplaced", deserialize_with = "lenient_coordinate")]
    pub latitude: f64,
    /// WGS84 longitude, expected in [-180, 180]. NaN when absent.
    #[serde(default = "unplaced", deserialize_with = "lenient_coordinate")]
    pub longitude: f64,
    /// Water level in centimeters. The backend reports 0 for sensors that have
    /// never produced a reading; a null or non-numeric level reads as 0 too.
    #[serde(default, deserialize_with = "lenient_level")]
    pub water_level: f64,
    #[serde(default)]
    pub area: Option<String>,
    /// ISO 8601 or `YYYY-MM-DD HH:MM:SS` (UTC, as stored by the backend).
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Display name computed by the backend, e.g. "Downtown Drain".
    #[serde(default)]
    pub name: Option<String>,
}

impl LocationReading {
    /// Both coordinates are finite numbers.
    pub fn is_placed(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

fn unplaced() -> f64 {
    f64::NAN
}

/// Number, or a string holding one. Anything else is `None`.
fn number_in(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_in(&value).unwrap_or(f64::NAN))
}

fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(number_in(&value).filter(|v| v.is_finite()).unwrap_or(0.0))
}

// ---------------------------------------------------------------------------
// Dashboard types
// ---------------------------------------------------------------------------

/// A registered sensor and its fixed position (`GET /api/sensors`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub sensor_id: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub area: Option<String>,
}

/// A single stored water-level sample (`GET /api/readings`, `GET /api/latest`).
///
/// The backend stores whatever the device reported, so the level may be
/// text ("offline") rather than a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(default)]
    pub id: Option<i64>,
    pub sensor_id: String,
    #[serde(default = "missing_value", deserialize_with = "lenient_stored_value")]
    pub water_level: StoredValue,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A stored threshold breach (`GET /api/alerts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub id: Option<i64>,
    pub sensor_id: String,
    #[serde(default = "missing_value", deserialize_with = "lenient_stored_value")]
    pub water_level: StoredValue,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Aggregate counters shown in the dashboard header widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_sensors: u64,
    #[serde(default)]
    pub total_readings: u64,
    #[serde(default)]
    pub total_alerts: u64,
    /// Mean water level over the last 24 hours, 0 when there were none.
    #[serde(default)]
    pub avg_water_level: f64,
    #[serde(default)]
    pub latest_reading: Option<Reading>,
    #[serde(default)]
    pub recent_readings_count: u64,
}

/// Value echoed back by `POST /api/store-reading` after the backend pulled a
/// sample from the device cloud. The device may report a non-numeric value,
/// which the backend forwards verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Number(f64),
    Text(String),
}

impl StoredValue {
    /// Level in cm when the value is (or spells) a finite number.
    pub fn level(&self) -> Option<f64> {
        let level = match self {
            StoredValue::Number(v) => Some(*v),
            StoredValue::Text(s) => s.trim().parse::<f64>().ok(),
        };
        level.filter(|v| v.is_finite())
    }
}

impl From<f64> for StoredValue {
    fn from(level: f64) -> Self {
        StoredValue::Number(level)
    }
}

fn missing_value() -> StoredValue {
    StoredValue::Text(String::new())
}

fn lenient_stored_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StoredValue, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().map_or_else(|| StoredValue::Text(n.to_string()), StoredValue::Number),
        Value::String(s) => StoredValue::Text(s),
        Value::Null => missing_value(),
        other => StoredValue::Text(other.to_string()),
    })
}

impl std::fmt::Display for StoredValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoredValue::Number(v) => write!(f, "{}", v),
            StoredValue::Text(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/store-reading`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreReadingRequest {
    pub pin: String,
    pub sensor_id: String,
}

impl StoreReadingRequest {
    /// Builds the request the dashboards send: the sensor id is derived from
    /// the virtual pin as `blynk_<pin>`.
    pub fn for_pin(pin: &str) -> Self {
        StoreReadingRequest {
            pin: pin.to_string(),
            sensor_id: format!("blynk_{}", pin),
        }
    }
}

/// Body of `POST /api/sensors/add-location`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddLocationRequest {
    pub sensor_id: String,
    pub sensor_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub area: String,
}

/// Body of `POST /api/register_sensor`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterSensorRequest {
    pub sensor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub area: String,
}

/// Body of `POST /api/sensor_data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorDataRequest {
    pub sensor_id: String,
    pub water_level: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when talking to the Flowra backend.
///
/// None of these are fatal: views log them, keep their prior state, and show
/// `user_message()` where the page has an error banner.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, timeout).
    #[error("Transport error: {0}")]
    Transport(String),
    /// Non-2xx HTTP response without a usable error body.
    #[error("HTTP error: {0}")]
    HttpError(u16),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The backend answered with `success: false` and this error text.
    #[error("Rejected by backend: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Message shown to the operator. `fallback` is the page-specific text
    /// used when the backend did not say anything more useful.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Transport(_) => "Failed to connect to server".to_string(),
            ApiError::Rejected(msg) if !msg.trim().is_empty() => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}
