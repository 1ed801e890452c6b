/// Sensors page: the registered sensor list and the "add location" form.
///
/// The form is validated locally before anything is sent; the backend
/// repeats the same checks and its error text wins when it refuses.

use std::sync::Arc;

use crate::api::FlowraApi;
use crate::logging::{self, LogSource};
use crate::model::{AddLocationRequest, ApiError, Sensor};

pub const DEFAULT_AREA: &str = "Unknown Area";
pub const REGISTERED_MESSAGE: &str = "Sensor location registered successfully!";
pub const REGISTER_FAILED_MESSAGE: &str = "Failed to register sensor";
pub const CONNECT_FAILED_MESSAGE: &str = "Failed to connect to server";

// ---------------------------------------------------------------------------
// Form validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Sensor ID is required")]
    MissingSensorId,
    #[error("Sensor Name is required")]
    MissingSensorName,
    #[error("Latitude must be between -90 and 90")]
    LatitudeOutOfRange,
    #[error("Longitude must be between -180 and 180")]
    LongitudeOutOfRange,
}

/// Raw text of the registration form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorForm {
    pub sensor_id: String,
    pub sensor_name: String,
    pub latitude: String,
    pub longitude: String,
    pub area: String,
}

fn parse_in_range(field: &str, min: f64, max: f64) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (min..=max).contains(v))
}

impl SensorForm {
    /// Checks the fields in form order and builds the request body. An
    /// unparseable coordinate reports the range error for its axis.
    pub fn validate(&self) -> Result<AddLocationRequest, RegistrationError> {
        let sensor_id = self.sensor_id.trim();
        if sensor_id.is_empty() {
            return Err(RegistrationError::MissingSensorId);
        }
        let sensor_name = self.sensor_name.trim();
        if sensor_name.is_empty() {
            return Err(RegistrationError::MissingSensorName);
        }
        let latitude =
            parse_in_range(&self.latitude, -90.0, 90.0).ok_or(RegistrationError::LatitudeOutOfRange)?;
        let longitude = parse_in_range(&self.longitude, -180.0, 180.0)
            .ok_or(RegistrationError::LongitudeOutOfRange)?;

        let area = match self.area.trim() {
            "" => DEFAULT_AREA,
            area => area,
        };

        Ok(AddLocationRequest {
            sensor_id: sensor_id.to_string(),
            sensor_name: sensor_name.to_string(),
            latitude,
            longitude,
            area: area.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Page state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

/// Banner shown above the form after a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl FormMessage {
    fn error(text: impl Into<String>) -> Self {
        FormMessage {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }
}

pub struct SensorsView {
    api: Arc<dyn FlowraApi>,
    sensors: Vec<Sensor>,
}

impl SensorsView {
    pub async fn mount(api: Arc<dyn FlowraApi>) -> Self {
        let mut view = SensorsView {
            api,
            sensors: Vec::new(),
        };
        let _ = view.refresh_sensors().await;
        view
    }

    /// Reloads the sensor list; on failure the previous list stays.
    pub async fn refresh_sensors(&mut self) -> Result<usize, ApiError> {
        let sensors = self.api.sensors().await?;
        self.sensors = sensors;
        Ok(self.sensors.len())
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// Validates and posts the form. On success the sensor list is
    /// refreshed before returning.
    pub async fn submit(&mut self, form: &SensorForm) -> FormMessage {
        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => return FormMessage::error(e.to_string()),
        };

        match self.api.add_sensor_location(&request).await {
            Ok(()) => {
                logging::info(
                    LogSource::View,
                    Some(request.sensor_id.as_str()),
                    &format!("Registered sensor at ({}, {})", request.latitude, request.longitude),
                );
                if let Err(e) = self.refresh_sensors().await {
                    logging::warn(
                        LogSource::View,
                        None,
                        &format!("Sensor list refresh after registration failed: {}", e),
                    );
                }
                FormMessage {
                    kind: MessageKind::Success,
                    text: REGISTERED_MESSAGE.to_string(),
                }
            }
            Err(ApiError::Transport(_)) | Err(ApiError::ParseError(_)) => {
                FormMessage::error(CONNECT_FAILED_MESSAGE)
            }
            Err(e) => FormMessage::error(e.user_message(REGISTER_FAILED_MESSAGE)),
        }
    }
}
