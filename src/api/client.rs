/// Flowra backend REST client
///
/// Talks JSON over HTTP to the Flask backend. Every endpoint wraps its
/// payload in a small envelope (`{success, locations, error}`,
/// `{readings}`, ...) whose fields may be absent; the envelopes below keep
/// every field optional and the `parse_*_response` functions turn absence
/// into empty collections or typed errors at this boundary.
///
/// Endpoints: see `FlowraApi` in the parent module.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::api::FlowraApi;
use crate::config::ApiConfig;
use crate::logging;
use crate::model::{
    AddLocationRequest, Alert, ApiError, DashboardStats, LocationReading, Reading,
    RegisterSensorRequest, Sensor, SensorDataRequest, StoreReadingRequest, StoredValue,
};

pub const DRAINAGE_LOCATIONS_PATH: &str = "/api/drainage-locations";
pub const SENSORS_PATH: &str = "/api/sensors";
pub const READINGS_PATH: &str = "/api/readings";
pub const ALERTS_PATH: &str = "/api/alerts";
pub const DASHBOARD_STATS_PATH: &str = "/api/dashboard/stats";
pub const LATEST_PATH: &str = "/api/latest";
pub const STORE_READING_PATH: &str = "/api/store-reading";
pub const ADD_LOCATION_PATH: &str = "/api/sensors/add-location";
pub const REGISTER_SENSOR_PATH: &str = "/api/register_sensor";
pub const SENSOR_DATA_PATH: &str = "/api/sensor_data";

// ============================================================================
// Response Envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LocationsEnvelope {
    pub success: Option<bool>,
    pub locations: Option<Vec<LocationReading>>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SensorsEnvelope {
    pub sensors: Option<Vec<Sensor>>,
}

#[derive(Debug, Deserialize)]
pub struct ReadingsEnvelope {
    pub readings: Option<Vec<Reading>>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsEnvelope {
    pub alerts: Option<Vec<Alert>>,
}

#[derive(Debug, Deserialize)]
pub struct StatsEnvelope {
    pub stats: Option<DashboardStats>,
}

#[derive(Debug, Deserialize)]
pub struct LatestEnvelope {
    pub success: Option<bool>,
    pub data: Option<Reading>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StoredData {
    pub sensor_value: Option<StoredValue>,
}

#[derive(Debug, Deserialize)]
pub struct StoreEnvelope {
    pub success: Option<bool>,
    pub data: Option<StoredData>,
    pub error: Option<String>,
}

/// Shape shared by the write endpoints and by error bodies.
#[derive(Debug, Deserialize)]
pub struct StatusEnvelope {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// URL Builders
// ============================================================================

/// Joins a base URL and an absolute API path without doubling the slash.
pub fn build_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

pub fn build_readings_url(base_url: &str, limit: u32) -> String {
    format!("{}?limit={}", build_url(base_url, READINGS_PATH), limit)
}

pub fn build_alerts_url(base_url: &str, limit: u32) -> String {
    format!("{}?limit={}", build_url(base_url, ALERTS_PATH), limit)
}

// ============================================================================
// Response Parsing
// ============================================================================

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::ParseError(e.to_string()))
}

fn rejected(error: Option<String>) -> ApiError {
    ApiError::Rejected(error.unwrap_or_default())
}

/// Parse `GET /api/drainage-locations`. Anything but `success: true` is a
/// rejection carrying the backend's `error` text (possibly empty).
pub fn parse_locations_response(body: &str) -> Result<Vec<LocationReading>, ApiError> {
    let envelope: LocationsEnvelope = decode(body)?;
    if envelope.success == Some(true) {
        Ok(envelope.locations.unwrap_or_default())
    } else {
        Err(rejected(envelope.error))
    }
}

pub fn parse_sensors_response(body: &str) -> Result<Vec<Sensor>, ApiError> {
    let envelope: SensorsEnvelope = decode(body)?;
    Ok(envelope.sensors.unwrap_or_default())
}

pub fn parse_readings_response(body: &str) -> Result<Vec<Reading>, ApiError> {
    let envelope: ReadingsEnvelope = decode(body)?;
    Ok(envelope.readings.unwrap_or_default())
}

pub fn parse_alerts_response(body: &str) -> Result<Vec<Alert>, ApiError> {
    let envelope: AlertsEnvelope = decode(body)?;
    Ok(envelope.alerts.unwrap_or_default())
}

/// `None` when the body has no `stats` object; the dashboard then keeps the
/// counters it already shows.
pub fn parse_stats_response(body: &str) -> Result<Option<DashboardStats>, ApiError> {
    let envelope: StatsEnvelope = decode(body)?;
    Ok(envelope.stats)
}

pub fn parse_latest_response(body: &str) -> Result<Option<Reading>, ApiError> {
    let envelope: LatestEnvelope = decode(body)?;
    if envelope.success == Some(true) {
        Ok(envelope.data)
    } else {
        Err(rejected(envelope.error))
    }
}

pub fn parse_store_response(body: &str) -> Result<StoredValue, ApiError> {
    let envelope: StoreEnvelope = decode(body)?;
    if envelope.success != Some(true) {
        return Err(rejected(envelope.error));
    }
    envelope
        .data
        .and_then(|d| d.sensor_value)
        .ok_or_else(|| ApiError::ParseError("missing data.sensor_value".to_string()))
}

pub fn parse_add_location_response(body: &str) -> Result<(), ApiError> {
    let envelope: StatusEnvelope = decode(body)?;
    if envelope.success == Some(true) {
        Ok(())
    } else {
        Err(rejected(envelope.error))
    }
}

/// Parse the ingestion helpers' replies: `{"message": ...}` for
/// registration, `{"status": ...}` for data, `{"error": ...}` on refusal.
pub fn parse_ingest_response(body: &str) -> Result<String, ApiError> {
    let envelope: StatusEnvelope = decode(body)?;
    if let Some(error) = envelope.error {
        return Err(ApiError::Rejected(error));
    }
    envelope
        .message
        .or(envelope.status)
        .ok_or_else(|| ApiError::ParseError("missing message or status".to_string()))
}

/// Error for a non-2xx response. A JSON body with an `error` field becomes a
/// rejection with that text; anything else is reported by status code.
pub fn error_from_status(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<StatusEnvelope>(body) {
        Ok(StatusEnvelope { error: Some(error), .. }) if !error.trim().is_empty() => {
            ApiError::Rejected(error)
        }
        _ => ApiError::HttpError(status),
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// reqwest-backed `FlowraApi`.
#[derive(Debug, Clone)]
pub struct FlowraClient {
    http: reqwest::Client,
    base_url: String,
}

impl FlowraClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(FlowraClient {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, url: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_body(response).await
    }

    async fn post_text<B>(&self, url: &str, body: &B) -> Result<String, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(error_from_status(status.as_u16(), &text));
    }
    Ok(text)
}

/// Logs a failed call before handing the result back.
fn logged<T>(operation: &str, endpoint: &str, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(e) = &result {
        logging::log_api_failure(endpoint, operation, e);
    }
    result
}

#[async_trait]
impl FlowraApi for FlowraClient {
    async fn drainage_locations(&self) -> Result<Vec<LocationReading>, ApiError> {
        let url = build_url(&self.base_url, DRAINAGE_LOCATIONS_PATH);
        let result = self.get_text(&url).await.and_then(|body| parse_locations_response(&body));
        logged("GET", DRAINAGE_LOCATIONS_PATH, result)
    }

    async fn sensors(&self) -> Result<Vec<Sensor>, ApiError> {
        let url = build_url(&self.base_url, SENSORS_PATH);
        let result = self.get_text(&url).await.and_then(|body| parse_sensors_response(&body));
        logged("GET", SENSORS_PATH, result)
    }

    async fn readings(&self, limit: u32) -> Result<Vec<Reading>, ApiError> {
        let url = build_readings_url(&self.base_url, limit);
        let result = self.get_text(&url).await.and_then(|body| parse_readings_response(&body));
        logged("GET", READINGS_PATH, result)
    }

    async fn alerts(&self, limit: u32) -> Result<Vec<Alert>, ApiError> {
        let url = build_alerts_url(&self.base_url, limit);
        let result = self.get_text(&url).await.and_then(|body| parse_alerts_response(&body));
        logged("GET", ALERTS_PATH, result)
    }

    async fn dashboard_stats(&self) -> Result<Option<DashboardStats>, ApiError> {
        let url = build_url(&self.base_url, DASHBOARD_STATS_PATH);
        let result = self.get_text(&url).await.and_then(|body| parse_stats_response(&body));
        logged("GET", DASHBOARD_STATS_PATH, result)
    }

    async fn latest(&self) -> Result<Option<Reading>, ApiError> {
        let url = build_url(&self.base_url, LATEST_PATH);
        let result = self.get_text(&url).await.and_then(|body| parse_latest_response(&body));
        logged("GET", LATEST_PATH, result)
    }

    async fn store_reading(&self, request: &StoreReadingRequest) -> Result<StoredValue, ApiError> {
        let url = build_url(&self.base_url, STORE_READING_PATH);
        let result = self
            .post_text(&url, request)
            .await
            .and_then(|body| parse_store_response(&body));
        logged("POST", STORE_READING_PATH, result)
    }

    async fn add_sensor_location(&self, request: &AddLocationRequest) -> Result<(), ApiError> {
        let url = build_url(&self.base_url, ADD_LOCATION_PATH);
        let result = self
            .post_text(&url, request)
            .await
            .and_then(|body| parse_add_location_response(&body));
        logged("POST", ADD_LOCATION_PATH, result)
    }

    async fn register_sensor(&self, request: &RegisterSensorRequest) -> Result<String, ApiError> {
        let url = build_url(&self.base_url, REGISTER_SENSOR_PATH);
        let result = self
            .post_text(&url, request)
            .await
            .and_then(|body| parse_ingest_response(&body));
        logged("POST", REGISTER_SENSOR_PATH, result)
    }

    async fn submit_sensor_data(&self, request: &SensorDataRequest) -> Result<String, ApiError> {
        let url = build_url(&self.base_url, SENSOR_DATA_PATH);
        let result = self
            .post_text(&url, request)
            .await
            .and_then(|body| parse_ingest_response(&body));
        logged("POST", SENSOR_DATA_PATH, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_without_double_slash() {
        assert_eq!(
            build_url("http://localhost:5000/", DRAINAGE_LOCATIONS_PATH),
            "http://localhost:5000/api/drainage-locations"
        );
        assert_eq!(
            build_url("http://localhost:5000", SENSORS_PATH),
            "http://localhost:5000/api/sensors"
        );
    }

    #[test]
    fn test_limit_urls() {
        assert_eq!(
            build_readings_url("http://h", 20),
            "http://h/api/readings?limit=20"
        );
        assert_eq!(build_alerts_url("http://h", 5), "http://h/api/alerts?limit=5");
    }

    #[test]
    fn test_parse_locations_success() {
        let body = r#"{"success": true, "locations": [
            {"sensor_id": "A", "latitude": 10, "longitude": 20, "water_level": 85,
             "area": "North", "timestamp": "2024-05-01 12:00:00", "name": "North Drain"}
        ]}"#;
        let locations = parse_locations_response(body).expect("success envelope");
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].id.as_deref(), Some("A"));
        assert_eq!(locations[0].water_level, 85.0);
    }

    #[test]
    fn test_parse_locations_keeps_rows_around_a_null_position() {
        let body = r#"{"success": true, "locations": [
            {"sensor_id": "A", "latitude": 43.6, "longitude": -79.4, "water_level": 85},
            {"sensor_id": "B", "latitude": null, "longitude": null},
            {"sensor_id": "C", "latitude": 43.7, "longitude": -79.3, "water_level": null}
        ]}"#;
        let locations = parse_locations_response(body).expect("one bad row must not sink the set");
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0].water_level, 85.0);
        assert!(locations[0].is_placed());
        assert!(!locations[1].is_placed());
        assert!(locations[2].is_placed());
        assert_eq!(locations[2].water_level, 0.0);
    }

    #[test]
    fn test_parse_readings_keeps_text_levels() {
        let body = r#"{"readings": [
            {"id": 2, "sensor_id": "blynk_V0", "water_level": "offline", "timestamp": "2024-05-01 12:05:00"},
            {"id": 1, "sensor_id": "blynk_V0", "water_level": 41.0, "timestamp": "2024-05-01 12:00:00"}
        ]}"#;
        let readings = parse_readings_response(body).expect("text level tolerated");
        assert_eq!(readings[0].water_level, StoredValue::Text("offline".to_string()));
        assert_eq!(readings[1].water_level.level(), Some(41.0));

        let alerts = parse_alerts_response(r#"{"alerts": [{"sensor_id": "s", "water_level": null}]}"#)
            .expect("null alert level tolerated");
        assert_eq!(alerts[0].water_level.level(), None);
    }

    #[test]
    fn test_parse_locations_success_without_array_is_empty() {
        let locations = parse_locations_response(r#"{"success": true}"#).unwrap();
        assert!(locations.is_empty(), "absent locations are an empty set");
    }

    #[test]
    fn test_parse_locations_failure_carries_backend_text() {
        let err = parse_locations_response(r#"{"success": false, "error": "db down"}"#).unwrap_err();
        assert_eq!(err, ApiError::Rejected("db down".to_string()));
        assert_eq!(err.user_message("Failed to load drainage locations"), "db down");

        let bare = parse_locations_response(r#"{"success": false}"#).unwrap_err();
        assert_eq!(
            bare.user_message("Failed to load drainage locations"),
            "Failed to load drainage locations"
        );
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        assert!(matches!(
            parse_locations_response("<html>oops</html>"),
            Err(ApiError::ParseError(_))
        ));
        assert!(matches!(parse_readings_response(""), Err(ApiError::ParseError(_))));
    }

    #[test]
    fn test_parse_list_envelopes_default_to_empty() {
        assert!(parse_sensors_response("{}").unwrap().is_empty());
        assert!(parse_readings_response("{}").unwrap().is_empty());
        assert!(parse_alerts_response("{}").unwrap().is_empty());
        assert_eq!(parse_stats_response("{}").unwrap(), None, "absent stats are not zeros");
    }

    #[test]
    fn test_parse_stats_with_latest_reading() {
        let body = r#"{"stats": {"total_sensors": 3, "total_readings": 120, "total_alerts": 2,
            "avg_water_level": 41.5, "recent_readings_count": 12,
            "latest_reading": {"id": 9, "sensor_id": "blynk_V0", "water_level": 72.0,
                               "timestamp": "2024-05-01 12:00:00"}}}"#;
        let stats = parse_stats_response(body).unwrap().expect("stats object");
        assert_eq!(stats.total_sensors, 3);
        assert_eq!(stats.avg_water_level, 41.5);
        assert_eq!(stats.latest_reading.and_then(|r| r.water_level.level()), Some(72.0));
    }

    #[test]
    fn test_parse_latest() {
        let body = r#"{"success": true, "data": {"sensor_id": "blynk_V0", "water_level": 12.5}}"#;
        assert_eq!(
            parse_latest_response(body).unwrap().and_then(|r| r.water_level.level()),
            Some(12.5)
        );
        assert_eq!(parse_latest_response(r#"{"success": true}"#).unwrap(), None);
        assert!(parse_latest_response(r#"{"success": false, "error": "none"}"#).is_err());
    }

    #[test]
    fn test_parse_store_response() {
        let ok = parse_store_response(r#"{"success": true, "data": {"sensor_value": 47}}"#).unwrap();
        assert_eq!(ok.to_string(), "47");

        let refused =
            parse_store_response(r#"{"success": false, "error": "Blynk unreachable"}"#).unwrap_err();
        assert_eq!(refused, ApiError::Rejected("Blynk unreachable".to_string()));

        assert!(matches!(
            parse_store_response(r#"{"success": true}"#),
            Err(ApiError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_add_location_response() {
        assert_eq!(parse_add_location_response(r#"{"success": true}"#), Ok(()));
        assert_eq!(
            parse_add_location_response(r#"{"success": false, "error": "Sensor ID is required"}"#),
            Err(ApiError::Rejected("Sensor ID is required".to_string()))
        );
    }

    #[test]
    fn test_parse_ingest_response() {
        assert_eq!(
            parse_ingest_response(r#"{"message": "Sensor registered successfully"}"#).unwrap(),
            "Sensor registered successfully"
        );
        assert_eq!(
            parse_ingest_response(r#"{"status": "data received"}"#).unwrap(),
            "data received"
        );
        assert!(parse_ingest_response(r#"{"error": "bad"}"#).is_err());
    }

    #[test]
    fn test_error_from_status_prefers_error_body() {
        assert_eq!(
            error_from_status(400, r#"{"success": false, "error": "Invalid latitude"}"#),
            ApiError::Rejected("Invalid latitude".to_string())
        );
        assert_eq!(error_from_status(502, "Bad Gateway"), ApiError::HttpError(502));
        assert_eq!(error_from_status(500, r#"{"error": ""}"#), ApiError::HttpError(500));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
        };
        let client = FlowraClient::new(&config).expect("client builds");
        let err = client.drainage_locations().await.unwrap_err();
        assert!(
            matches!(err, ApiError::Transport(_)),
            "closed port should fail before any response, got {:?}",
            err
        );
        assert_eq!(err.user_message("x"), "Failed to connect to server");
    }

    #[tokio::test]
    #[ignore] // requires a running backend at the configured base URL
    async fn test_live_drainage_locations() {
        let client = FlowraClient::new(&ApiConfig::default()).expect("client builds");
        let locations = client.drainage_locations().await.expect("backend reachable");
        for location in &locations {
            assert!((-90.0..=90.0).contains(&location.latitude));
        }
    }
}
