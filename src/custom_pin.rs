/// Operator-entered ad hoc pins.
///
/// An ad hoc pin is a synthetic reading placed at typed-in coordinates. It is
/// shown alongside the fetched locations, never sent to the backend, and at
/// most one exists at a time.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::LocationReading;

/// Identifier carried by every ad hoc pin.
pub const CUSTOM_PIN_ID: &str = "custom";
pub const CUSTOM_PIN_AREA: &str = "Custom Location";
pub const CUSTOM_PIN_NAME: &str = "Custom Pin";

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Please enter valid latitude and longitude values")]
    InvalidNumber,
    #[error("Latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    #[error("Longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
}

/// Parses one coordinate field as a finite decimal number.
pub fn parse_coordinate(field: &str) -> Result<f64, CoordinateError> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(CoordinateError::InvalidNumber)
}

/// Checks both coordinates. Both must be finite before either range is
/// checked, and latitude is checked before longitude.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CoordinateError> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(CoordinateError::InvalidNumber);
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CoordinateError::LatitudeOutOfRange(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CoordinateError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

/// Builds the synthetic reading for a validated position.
pub fn custom_reading(latitude: f64, longitude: f64, now: DateTime<Utc>) -> LocationReading {
    LocationReading {
        id: Some(CUSTOM_PIN_ID.to_string()),
        latitude,
        longitude,
        water_level: 0.0,
        area: Some(CUSTOM_PIN_AREA.to_string()),
        timestamp: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        name: Some(CUSTOM_PIN_NAME.to_string()),
    }
}

/// Single slot holding the current ad hoc pin, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomPinSlot {
    pin: Option<LocationReading>,
}

impl CustomPinSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and places a pin, replacing any existing one. On error the
    /// slot is left untouched.
    pub fn set(&mut self, latitude: f64, longitude: f64, now: DateTime<Utc>) -> Result<&LocationReading, CoordinateError> {
        validate_coordinates(latitude, longitude)?;
        Ok(&*self.pin.insert(custom_reading(latitude, longitude, now)))
    }

    /// Same as `set`, from raw text fields.
    pub fn set_from_input(
        &mut self,
        latitude: &str,
        longitude: &str,
        now: DateTime<Utc>,
    ) -> Result<&LocationReading, CoordinateError> {
        let lat = parse_coordinate(latitude);
        let lng = parse_coordinate(longitude);
        match (lat, lng) {
            (Ok(lat), Ok(lng)) => self.set(lat, lng, now),
            _ => Err(CoordinateError::InvalidNumber),
        }
    }

    pub fn clear(&mut self) -> Option<LocationReading> {
        self.pin.take()
    }

    pub fn get(&self) -> Option<&LocationReading> {
        self.pin.as_ref()
    }

    /// `fetched` followed by the ad hoc pin, if one is set.
    pub fn merged_with(&self, fetched: &[LocationReading]) -> Vec<LocationReading> {
        let mut all = Vec::with_capacity(fetched.len() + 1);
        all.extend_from_slice(fetched);
        if let Some(pin) = &self.pin {
            all.push(pin.clone());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    #[test]
    fn test_latitude_out_of_range_adds_nothing() {
        let mut slot = CustomPinSlot::new();
        assert_eq!(slot.set(91.0, 0.0, now()), Err(CoordinateError::LatitudeOutOfRange(91.0)));
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_longitude_out_of_range() {
        assert_eq!(
            validate_coordinates(0.0, -180.5),
            Err(CoordinateError::LongitudeOutOfRange(-180.5))
        );
    }

    #[test]
    fn test_range_edges_are_inclusive() {
        assert_eq!(validate_coordinates(90.0, 180.0), Ok(()));
        assert_eq!(validate_coordinates(-90.0, -180.0), Ok(()));
    }

    #[test]
    fn test_latitude_checked_before_longitude() {
        assert_eq!(
            validate_coordinates(100.0, 200.0),
            Err(CoordinateError::LatitudeOutOfRange(100.0))
        );
    }

    #[test]
    fn test_valid_pin_has_zero_level_and_placeholder_id() {
        let mut slot = CustomPinSlot::new();
        let pin = slot.set(43.65, -79.38, now()).expect("valid coordinates").clone();
        assert_eq!(pin.id.as_deref(), Some(CUSTOM_PIN_ID));
        assert_eq!(pin.water_level, 0.0);
        assert_eq!(pin.area.as_deref(), Some(CUSTOM_PIN_AREA));
        assert_eq!(pin.timestamp.as_deref(), Some("2024-05-01T13:00:00.000Z"));
        assert_eq!(slot.merged_with(&[]).len(), 1);
    }

    #[test]
    fn test_new_pin_replaces_previous() {
        let mut slot = CustomPinSlot::new();
        slot.set(1.0, 1.0, now()).unwrap();
        slot.set(2.0, 2.0, now()).unwrap();
        let merged = slot.merged_with(&[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].latitude, 2.0);
    }

    #[test]
    fn test_invalid_replacement_keeps_previous_pin() {
        let mut slot = CustomPinSlot::new();
        slot.set(1.0, 1.0, now()).unwrap();
        assert!(slot.set(1.0, 500.0, now()).is_err());
        assert_eq!(slot.get().map(|p| p.latitude), Some(1.0));
    }

    #[test]
    fn test_clear_removes_pin() {
        let mut slot = CustomPinSlot::new();
        slot.set(1.0, 1.0, now()).unwrap();
        assert!(slot.clear().is_some());
        assert!(slot.get().is_none());
        assert!(slot.clear().is_none());
    }

    #[test]
    fn test_text_input_must_be_finite_numbers() {
        let mut slot = CustomPinSlot::new();
        for (lat, lng) in [("", "1"), ("abc", "1"), ("1", "NaN"), ("inf", "1"), ("1", "  ")] {
            assert_eq!(
                slot.set_from_input(lat, lng, now()).map(|_| ()),
                Err(CoordinateError::InvalidNumber),
                "({:?}, {:?}) should be rejected as not a number",
                lat,
                lng
            );
        }
        assert!(slot.get().is_none());
        assert!(slot.set_from_input(" 43.6532 ", "-79.3832", now()).is_ok());
    }

    #[test]
    fn test_merge_appends_pin_after_fetched() {
        let mut slot = CustomPinSlot::new();
        let fetched = vec![custom_reading(5.0, 5.0, now())];
        assert_eq!(slot.merged_with(&fetched).len(), 1);
        slot.set(1.0, 1.0, now()).unwrap();
        let merged = slot.merged_with(&fetched);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].latitude, 1.0);
    }
}
