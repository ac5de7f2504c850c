use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Ignition, Vehicle};
use crate::utils::validation::{parse_datetime, validate_ignition, validate_not_empty, validate_timestamp};

// Muestra de telemetría enviada por un rastreador
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRequest {
    #[serde(alias = "plate")]
    #[validate(custom = "validate_not_empty")]
    pub license_plate: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub speed: f64,
    pub heading: Option<f64>,
    #[validate(custom = "validate_ignition")]
    pub ignition: Option<String>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_level: Option<f64>,
    #[validate(custom = "validate_timestamp")]
    pub timestamp: Option<String>,
}

impl TrackingRequest {
    pub fn plate(&self) -> &str {
        self.license_plate.trim()
    }

    /// Ignición declarada; sólo tiene sentido tras `validate()`
    pub fn ignition(&self) -> Option<Ignition> {
        self.ignition.as_deref().and_then(Ignition::parse)
    }

    /// Momento de la muestra, `now` si el rastreador no lo envía
    pub fn timestamp_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.timestamp
            .as_deref()
            .and_then(|value| parse_datetime(value).ok())
            .unwrap_or(now)
    }
}

// Respuesta de ingesta
#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    pub success: bool,
    pub message: String,
    pub vehicle: Vehicle,
}

impl TrackingResponse {
    pub fn accepted(vehicle: Vehicle) -> Self {
        Self {
            success: true,
            message: "Location updated successfully".to_string(),
            vehicle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> TrackingRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_sample() {
        let sample = request(json!({
            "licensePlate": "ABC-123",
            "latitude": -23.55,
            "longitude": -46.63,
            "speed": 60,
            "ignition": "on",
            "timestamp": "2024-05-01T12:00:00Z"
        }));
        assert!(sample.validate().is_ok());
        assert_eq!(sample.ignition(), Some(Ignition::On));
        assert_eq!(
            sample.timestamp_or(Utc::now()).to_rfc3339(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_plate_alias() {
        let sample = request(json!({"plate": "XYZ-9", "latitude": 0, "longitude": 0, "speed": 0}));
        assert_eq!(sample.plate(), "XYZ-9");
    }

    #[test]
    fn test_field_errors() {
        let sample = request(json!({
            "licensePlate": "  ",
            "latitude": 91,
            "longitude": -181,
            "speed": -1,
            "ignition": "maybe",
            "batteryLevel": 120,
            "timestamp": "yesterday"
        }));
        let errors = sample.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in [
            "license_plate",
            "latitude",
            "longitude",
            "speed",
            "ignition",
            "battery_level",
            "timestamp",
        ] {
            assert!(fields.contains_key(field), "missing error for {}", field);
        }
    }
}
