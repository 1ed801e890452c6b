/// In-process stand-in for the Flowra backend used by the integration tests.
///
/// Responses are set per endpoint; drainage-location responses can be
/// scripted as a queue whose last entry repeats. Every call is counted.
#[allow(dead_code)]
pub mod fake {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use flowra_dashboard::api::FlowraApi;
    use flowra_dashboard::model::{
        AddLocationRequest, Alert, ApiError, DashboardStats, LocationReading, Reading,
        RegisterSensorRequest, Sensor, SensorDataRequest, StoreReadingRequest, StoredValue,
    };

    pub struct FakeBackend {
        script: Mutex<VecDeque<Result<Vec<LocationReading>, ApiError>>>,
        last_locations: Mutex<Result<Vec<LocationReading>, ApiError>>,
        pub sensors: Mutex<Vec<Sensor>>,
        pub readings: Mutex<Vec<Reading>>,
        pub alerts: Mutex<Vec<Alert>>,
        /// `None` answers with a body that has no stats object.
        pub stats: Mutex<Option<DashboardStats>>,
        pub latest: Mutex<Result<Option<Reading>, ApiError>>,
        pub store_result: Mutex<Result<StoredValue, ApiError>>,
        pub add_location_result: Mutex<Result<(), ApiError>>,
        /// When set, `/api/dashboard/stats` fails with this error.
        pub stats_error: Mutex<Option<ApiError>>,
        pub posted_locations: Mutex<Vec<AddLocationRequest>>,
        pub store_requests: Mutex<Vec<StoreReadingRequest>>,
        pub limits_seen: Mutex<Vec<(&'static str, u32)>>,
        calls: Mutex<HashMap<&'static str, usize>>,
    }

    impl FakeBackend {
        pub fn new() -> Arc<Self> {
            Arc::new(FakeBackend {
                script: Mutex::new(VecDeque::new()),
                last_locations: Mutex::new(Ok(Vec::new())),
                sensors: Mutex::new(Vec::new()),
                readings: Mutex::new(Vec::new()),
                alerts: Mutex::new(Vec::new()),
                stats: Mutex::new(Some(DashboardStats::default())),
                latest: Mutex::new(Ok(None)),
                store_result: Mutex::new(Ok(StoredValue::Number(0.0))),
                add_location_result: Mutex::new(Ok(())),
                stats_error: Mutex::new(None),
                posted_locations: Mutex::new(Vec::new()),
                store_requests: Mutex::new(Vec::new()),
                limits_seen: Mutex::new(Vec::new()),
                calls: Mutex::new(HashMap::new()),
            })
        }

        pub fn with_locations(locations: Vec<LocationReading>) -> Arc<Self> {
            let fake = Self::new();
            *fake.last_locations.lock().unwrap() = Ok(locations);
            fake
        }

        /// Queues drainage-location responses, served in order.
        pub fn script(&self, responses: Vec<Result<Vec<LocationReading>, ApiError>>) {
            self.script.lock().unwrap().extend(responses);
        }

        pub fn calls(&self, endpoint: &str) -> usize {
            self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
        }

        fn hit(&self, endpoint: &'static str) {
            *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
        }
    }

    pub fn location(id: &str, lat: f64, lng: f64, level: f64) -> LocationReading {
        LocationReading {
            id: Some(id.to_string()),
            latitude: lat,
            longitude: lng,
            water_level: level,
            area: Some("Downtown".to_string()),
            timestamp: Some("2024-05-01 12:00:00".to_string()),
            name: None,
        }
    }

    pub fn reading(id: i64, sensor: &str, level: f64) -> Reading {
        Reading {
            id: Some(id),
            sensor_id: sensor.to_string(),
            water_level: StoredValue::Number(level),
            timestamp: Some("2024-05-01 12:00:00".to_string()),
        }
    }

    /// A reading whose device reported text instead of a number.
    pub fn text_reading(id: i64, sensor: &str, text: &str) -> Reading {
        Reading {
            water_level: StoredValue::Text(text.to_string()),
            ..reading(id, sensor, 0.0)
        }
    }

    #[async_trait]
    impl FlowraApi for FakeBackend {
        async fn drainage_locations(&self) -> Result<Vec<LocationReading>, ApiError> {
            self.hit("drainage_locations");
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last_locations.lock().unwrap();
            if let Some(next) = next {
                *last = next;
            }
            last.clone()
        }

        async fn sensors(&self) -> Result<Vec<Sensor>, ApiError> {
            self.hit("sensors");
            Ok(self.sensors.lock().unwrap().clone())
        }

        async fn readings(&self, limit: u32) -> Result<Vec<Reading>, ApiError> {
            self.hit("readings");
            self.limits_seen.lock().unwrap().push(("readings", limit));
            Ok(self.readings.lock().unwrap().iter().take(limit as usize).cloned().collect())
        }

        async fn alerts(&self, limit: u32) -> Result<Vec<Alert>, ApiError> {
            self.hit("alerts");
            self.limits_seen.lock().unwrap().push(("alerts", limit));
            Ok(self.alerts.lock().unwrap().iter().take(limit as usize).cloned().collect())
        }

        async fn dashboard_stats(&self) -> Result<Option<DashboardStats>, ApiError> {
            self.hit("dashboard_stats");
            if let Some(e) = self.stats_error.lock().unwrap().clone() {
                return Err(e);
            }
            Ok(self.stats.lock().unwrap().clone())
        }

        async fn latest(&self) -> Result<Option<Reading>, ApiError> {
            self.hit("latest");
            self.latest.lock().unwrap().clone()
        }

        async fn store_reading(&self, request: &StoreReadingRequest) -> Result<StoredValue, ApiError> {
            self.hit("store_reading");
            self.store_requests.lock().unwrap().push(request.clone());
            self.store_result.lock().unwrap().clone()
        }

        async fn add_sensor_location(&self, request: &AddLocationRequest) -> Result<(), ApiError> {
            self.hit("add_sensor_location");
            self.posted_locations.lock().unwrap().push(request.clone());
            let result = self.add_location_result.lock().unwrap().clone();
            if result.is_ok() {
                self.sensors.lock().unwrap().push(Sensor {
                    sensor_id: request.sensor_id.clone(),
                    latitude: Some(request.latitude),
                    longitude: Some(request.longitude),
                    area: Some(request.area.clone()),
                });
            }
            result
        }

        async fn register_sensor(&self, _request: &RegisterSensorRequest) -> Result<String, ApiError> {
            self.hit("register_sensor");
            Ok("Sensor registered successfully".to_string())
        }

        async fn submit_sensor_data(&self, _request: &SensorDataRequest) -> Result<String, ApiError> {
            self.hit("submit_sensor_data");
            Ok("data received".to_string())
        }
    }
}
