/// Access to the Flowra backend.
///
/// Views talk to the backend only through the `FlowraApi` trait so that the
/// live HTTP client, the offline fixture (`dev_mode`) and test fakes are
/// interchangeable.

pub mod client;

use async_trait::async_trait;

use crate::model::{
    AddLocationRequest, Alert, ApiError, DashboardStats, LocationReading, Reading,
    RegisterSensorRequest, Sensor, SensorDataRequest, StoreReadingRequest, StoredValue,
};

pub use client::FlowraClient;

#[async_trait]
pub trait FlowraApi: Send + Sync {
    /// `GET /api/drainage-locations`
    async fn drainage_locations(&self) -> Result<Vec<LocationReading>, ApiError>;

    /// `GET /api/sensors`
    async fn sensors(&self) -> Result<Vec<Sensor>, ApiError>;

    /// `GET /api/readings?limit=N`, newest first.
    async fn readings(&self, limit: u32) -> Result<Vec<Reading>, ApiError>;

    /// `GET /api/alerts?limit=N`, newest first.
    async fn alerts(&self, limit: u32) -> Result<Vec<Alert>, ApiError>;

    /// `GET /api/dashboard/stats`. `Ok(None)` when the body carried no
    /// `stats` object.
    async fn dashboard_stats(&self) -> Result<Option<DashboardStats>, ApiError>;

    /// `GET /api/latest`. `Ok(None)` when the backend has no reading yet.
    async fn latest(&self) -> Result<Option<Reading>, ApiError>;

    /// `POST /api/store-reading`. Returns the value the backend pulled from
    /// the device cloud and stored.
    async fn store_reading(&self, request: &StoreReadingRequest) -> Result<StoredValue, ApiError>;

    /// `POST /api/sensors/add-location`
    async fn add_sensor_location(&self, request: &AddLocationRequest) -> Result<(), ApiError>;

    /// `POST /api/register_sensor`. Returns the backend's confirmation text.
    async fn register_sensor(&self, request: &RegisterSensorRequest) -> Result<String, ApiError>;

    /// `POST /api/sensor_data`. Returns the backend's status text.
    async fn submit_sensor_data(&self, request: &SensorDataRequest) -> Result<String, ApiError>;
}
