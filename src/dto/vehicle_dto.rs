use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::config::EnvironmentConfig;
use crate::models::{Ignition, NewVehicle, VehiclePatch};
use crate::utils::geo::normalize_heading;
use crate::utils::validation::{validate_ignition, validate_not_empty};

// Request para crear un vehículo
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[validate(custom = "validate_not_empty")]
    pub license_plate: String,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub model: Option<String>,
    #[validate(range(min = 0.0))]
    pub speed_limit: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_level: Option<f64>,
}

impl CreateVehicleRequest {
    pub fn into_new_vehicle(self, config: &EnvironmentConfig) -> NewVehicle {
        let license_plate = self.license_plate.trim().to_string();
        NewVehicle {
            name: self
                .name
                .unwrap_or_else(|| format!("Vehicle {}", license_plate)),
            license_plate,
            model: self.model,
            ignition: Ignition::Off,
            current_speed: 0.0,
            speed_limit: self.speed_limit.unwrap_or(config.default_speed_limit),
            heading: 0.0,
            latitude: self.latitude.unwrap_or(0.0),
            longitude: self.longitude.unwrap_or(0.0),
            accuracy: config.default_accuracy,
            last_update: Utc::now(),
            battery_level: self.battery_level,
        }
    }
}

// Request para actualizar un vehículo
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(custom = "validate_not_empty")]
    pub license_plate: Option<String>,
    pub model: Option<String>,
    #[validate(custom = "validate_ignition")]
    pub ignition: Option<String>,
    #[validate(range(min = 0.0))]
    pub current_speed: Option<f64>,
    #[validate(range(min = 0.0))]
    pub speed_limit: Option<f64>,
    pub heading: Option<f64>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    /// Metros; cabe en la columna `NUMERIC(8, 2)`
    #[validate(range(min = 0.0, max = 10000.0))]
    pub accuracy: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub battery_level: Option<f64>,
}

impl From<UpdateVehicleRequest> for VehiclePatch {
    fn from(request: UpdateVehicleRequest) -> Self {
        VehiclePatch {
            name: request.name,
            license_plate: request.license_plate.map(|p| p.trim().to_string()),
            model: request.model,
            ignition: request.ignition.as_deref().and_then(Ignition::parse),
            current_speed: request.current_speed,
            speed_limit: request.speed_limit,
            heading: request.heading.map(normalize_heading),
            latitude: request.latitude,
            longitude: request.longitude,
            accuracy: request.accuracy,
            battery_level: request.battery_level,
        }
    }
}
