/// Development mode backend
///
/// When no Flowra backend is reachable, `DevMode` serves a JSON fixture of
/// drainage locations through `FlowraApi` so the binary and the views can
/// run offline. Sensors, readings, alerts and stats are derived from the
/// fixture and from whatever is written through the API while it runs.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::api::FlowraApi;
use crate::custom_pin::validate_coordinates;
use crate::model::{
    AddLocationRequest, Alert, ApiError, DashboardStats, LocationReading, Reading,
    RegisterSensorRequest, Sensor, SensorDataRequest, StoreReadingRequest, StoredValue,
};

/// The backend records an alert for levels strictly above this.
pub const BACKEND_ALERT_THRESHOLD_CM: f64 = 70.0;

/// Readings and alerts kept in memory; older entries are dropped first.
pub const DEV_HISTORY_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum DevModeError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Either a bare array of locations or the `/api/drainage-locations` body.
#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    Bare(Vec<LocationReading>),
    Envelope { locations: Vec<LocationReading> },
}

#[derive(Debug, Default)]
struct DevState {
    locations: Vec<LocationReading>,
    /// Oldest first, at most `DEV_HISTORY_LIMIT`.
    readings: Vec<Reading>,
    alerts: Vec<Alert>,
    next_id: i64,
}

impl DevState {
    fn record(&mut self, sensor_id: &str, water_level: f64) -> Reading {
        self.next_id += 1;
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let reading = Reading {
            id: Some(self.next_id),
            sensor_id: sensor_id.to_string(),
            water_level: StoredValue::Number(water_level),
            timestamp: Some(timestamp.clone()),
        };
        push_capped(&mut self.readings, reading.clone());

        if water_level > BACKEND_ALERT_THRESHOLD_CM {
            push_capped(
                &mut self.alerts,
                Alert {
                    id: Some(self.next_id),
                    sensor_id: sensor_id.to_string(),
                    water_level: StoredValue::Number(water_level),
                    timestamp: Some(timestamp.clone()),
                },
            );
        }

        if let Some(location) = self.location_mut(sensor_id) {
            location.water_level = water_level;
            location.timestamp = Some(timestamp);
        }
        reading
    }

    fn has_sensor(&self, sensor_id: &str) -> bool {
        self.locations.iter().any(|l| l.id.as_deref() == Some(sensor_id))
    }

    fn location_mut(&mut self, sensor_id: &str) -> Option<&mut LocationReading> {
        self.locations.iter_mut().find(|l| l.id.as_deref() == Some(sensor_id))
    }
}

fn push_capped<T>(items: &mut Vec<T>, item: T) {
    if items.len() >= DEV_HISTORY_LIMIT {
        let excess = items.len() + 1 - DEV_HISTORY_LIMIT;
        items.drain(..excess);
    }
    items.push(item);
}

fn newest_first<T: Clone>(items: &[T], limit: u32) -> Vec<T> {
    items.iter().rev().take(limit as usize).cloned().collect()
}

fn check_position(latitude: f64, longitude: f64) -> Result<(), ApiError> {
    validate_coordinates(latitude, longitude).map_err(|e| ApiError::Rejected(e.to_string()))
}

/// Fixture-backed `FlowraApi`.
#[derive(Debug)]
pub struct DevMode {
    state: Mutex<DevState>,
}

impl DevMode {
    /// Seeds one stored reading per identified location.
    pub fn from_locations(locations: Vec<LocationReading>) -> Self {
        let mut state = DevState::default();
        let seeds: Vec<(String, f64)> = locations
            .iter()
            .filter_map(|l| l.id.clone().map(|id| (id, l.water_level)))
            .collect();
        state.locations = locations;
        for (id, level) in seeds {
            state.record(&id, level);
        }
        DevMode {
            state: Mutex::new(state),
        }
    }

    pub fn from_fixture_str(json: &str) -> Result<Self, DevModeError> {
        let locations = match serde_json::from_str::<Fixture>(json)? {
            Fixture::Bare(locations) => locations,
            Fixture::Envelope { locations } => locations,
        };
        Ok(Self::from_locations(locations))
    }

    pub fn load(path: &Path) -> Result<Self, DevModeError> {
        let text = std::fs::read_to_string(path).map_err(|source| DevModeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_fixture_str(&text)
    }

    fn lock(&self) -> MutexGuard<'_, DevState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FlowraApi for DevMode {
    async fn drainage_locations(&self) -> Result<Vec<LocationReading>, ApiError> {
        Ok(self.lock().locations.clone())
    }

    async fn sensors(&self) -> Result<Vec<Sensor>, ApiError> {
        Ok(self
            .lock()
            .locations
            .iter()
            .filter_map(|l| {
                l.id.as_ref().map(|id| Sensor {
                    sensor_id: id.clone(),
                    latitude: Some(l.latitude),
                    longitude: Some(l.longitude),
                    area: l.area.clone(),
                })
            })
            .collect())
    }

    async fn readings(&self, limit: u32) -> Result<Vec<Reading>, ApiError> {
        Ok(newest_first(&self.lock().readings, limit))
    }

    async fn alerts(&self, limit: u32) -> Result<Vec<Alert>, ApiError> {
        Ok(newest_first(&self.lock().alerts, limit))
    }

    async fn dashboard_stats(&self) -> Result<Option<DashboardStats>, ApiError> {
        let state = self.lock();
        let total_readings = state.readings.len();
        let levels: Vec<f64> = state.readings.iter().filter_map(|r| r.water_level.level()).collect();
        let avg_water_level = if levels.is_empty() {
            0.0
        } else {
            levels.iter().sum::<f64>() / levels.len() as f64
        };
        Ok(Some(DashboardStats {
            total_sensors: state.locations.iter().filter(|l| l.id.is_some()).count() as u64,
            total_readings: total_readings as u64,
            total_alerts: state.alerts.len() as u64,
            avg_water_level,
            latest_reading: state.readings.last().cloned(),
            recent_readings_count: total_readings as u64,
        }))
    }

    async fn latest(&self) -> Result<Option<Reading>, ApiError> {
        Ok(self.lock().readings.last().cloned())
    }

    /// Replays the current level of the matching location, or the mean of
    /// all locations when the pin's sensor is not in the fixture.
    async fn store_reading(&self, request: &StoreReadingRequest) -> Result<StoredValue, ApiError> {
        let mut state = self.lock();
        let level = match state
            .locations
            .iter()
            .find(|l| l.id.as_deref() == Some(request.sensor_id.as_str()))
        {
            Some(location) => location.water_level,
            None if state.locations.is_empty() => {
                return Err(ApiError::Rejected("No device data available".to_string()));
            }
            None => {
                let sum: f64 = state.locations.iter().map(|l| l.water_level).sum();
                (sum / state.locations.len() as f64 * 10.0).round() / 10.0
            }
        };
        state.record(&request.sensor_id, level);
        Ok(StoredValue::Number(level))
    }

    /// Registers a new location, or moves and renames an existing one.
    async fn add_sensor_location(&self, request: &AddLocationRequest) -> Result<(), ApiError> {
        check_position(request.latitude, request.longitude)?;
        let mut state = self.lock();
        if let Some(location) = state.location_mut(&request.sensor_id) {
            location.latitude = request.latitude;
            location.longitude = request.longitude;
            location.area = Some(request.area.clone());
            location.name = Some(request.sensor_name.clone());
            return Ok(());
        }
        state.locations.push(LocationReading {
            id: Some(request.sensor_id.clone()),
            latitude: request.latitude,
            longitude: request.longitude,
            water_level: 0.0,
            area: Some(request.area.clone()),
            timestamp: None,
            name: Some(request.sensor_name.clone()),
        });
        Ok(())
    }

    async fn register_sensor(&self, request: &RegisterSensorRequest) -> Result<String, ApiError> {
        check_position(request.latitude, request.longitude)?;
        let mut state = self.lock();
        if !state.has_sensor(&request.sensor_id) {
            state.locations.push(LocationReading {
                id: Some(request.sensor_id.clone()),
                latitude: request.latitude,
                longitude: request.longitude,
                water_level: 0.0,
                area: Some(request.area.clone()),
                timestamp: None,
                name: None,
            });
        }
        Ok("Sensor registered successfully".to_string())
    }

    async fn submit_sensor_data(&self, request: &SensorDataRequest) -> Result<String, ApiError> {
        if !request.water_level.is_finite() {
            return Err(ApiError::Rejected("water_level must be a number".to_string()));
        }
        self.lock().record(&request.sensor_id, request.water_level);
        Ok("data received".to_string())
    }
}
