//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle con su estado en vivo y las
//! variantes usadas para crear y actualizar vehículos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estado operativo del vehículo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Moving,
    Stopped,
    Idle,
    Offline,
}

impl VehicleStatus {
    /// Estado derivado de (ignición, velocidad). Nunca produce `Offline`.
    pub fn derive(ignition: Ignition, speed: f64) -> Self {
        if speed > 0.0 {
            VehicleStatus::Moving
        } else if ignition == Ignition::On {
            VehicleStatus::Idle
        } else {
            VehicleStatus::Stopped
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Moving => "moving",
            VehicleStatus::Stopped => "stopped",
            VehicleStatus::Idle => "idle",
            VehicleStatus::Offline => "offline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "moving" => Some(VehicleStatus::Moving),
            "stopped" => Some(VehicleStatus::Stopped),
            "idle" => Some(VehicleStatus::Idle),
            "offline" => Some(VehicleStatus::Offline),
            _ => None,
        }
    }
}

/// Estado de la ignición
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Ignition {
    On,
    #[default]
    Off,
}

impl Ignition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ignition::On => "on",
            Ignition::Off => "off",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on" => Some(Ignition::On),
            "off" => Some(Ignition::Off),
            _ => None,
        }
    }
}

/// Vehicle principal con su último estado conocido
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub license_plate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub status: VehicleStatus,
    pub ignition: Ignition,
    pub current_speed: f64,
    pub speed_limit: f64,
    pub heading: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub last_update: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
}

/// Datos para crear un vehículo (el id lo asigna el store)
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub name: String,
    pub license_plate: String,
    pub model: Option<String>,
    pub ignition: Ignition,
    pub current_speed: f64,
    pub speed_limit: f64,
    pub heading: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub last_update: DateTime<Utc>,
    pub battery_level: Option<f64>,
}

impl NewVehicle {
    pub fn into_vehicle(self, id: Uuid) -> Vehicle {
        Vehicle {
            id,
            status: VehicleStatus::derive(self.ignition, self.current_speed),
            name: self.name,
            license_plate: self.license_plate,
            model: self.model,
            ignition: self.ignition,
            current_speed: self.current_speed,
            speed_limit: self.speed_limit,
            heading: self.heading,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            last_update: self.last_update,
            battery_level: self.battery_level,
        }
    }
}

/// Actualización parcial de un vehículo (edición administrativa)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehiclePatch {
    pub name: Option<String>,
    pub license_plate: Option<String>,
    pub model: Option<String>,
    pub ignition: Option<Ignition>,
    pub current_speed: Option<f64>,
    pub speed_limit: Option<f64>,
    pub heading: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub battery_level: Option<f64>,
}

impl VehiclePatch {
    pub fn is_empty(&self) -> bool {
        *self == VehiclePatch::default()
    }

    /// Aplica el parche y recalcula el estado si cambió la ignición o la velocidad
    pub fn apply(self, vehicle: &Vehicle) -> Vehicle {
        let mut updated = vehicle.clone();
        let recompute_status = self.ignition.is_some() || self.current_speed.is_some();

        if let Some(name) = self.name {
            updated.name = name;
        }
        if let Some(plate) = self.license_plate {
            updated.license_plate = plate;
        }
        if self.model.is_some() {
            updated.model = self.model;
        }
        if let Some(ignition) = self.ignition {
            updated.ignition = ignition;
        }
        if let Some(speed) = self.current_speed {
            updated.current_speed = speed;
        }
        if let Some(limit) = self.speed_limit {
            updated.speed_limit = limit;
        }
        if let Some(heading) = self.heading {
            updated.heading = crate::utils::geo::normalize_heading(heading);
        }
        if let Some(latitude) = self.latitude {
            updated.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            updated.longitude = longitude;
        }
        if let Some(accuracy) = self.accuracy {
            updated.accuracy = accuracy;
        }
        if self.battery_level.is_some() {
            updated.battery_level = self.battery_level;
        }

        if recompute_status {
            updated.status = VehicleStatus::derive(updated.ignition, updated.current_speed);
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vehicle() -> Vehicle {
        NewVehicle {
            name: "Vehicle ABC-123".to_string(),
            license_plate: "ABC-123".to_string(),
            model: None,
            ignition: Ignition::On,
            current_speed: 40.0,
            speed_limit: 80.0,
            heading: 90.0,
            latitude: -23.55,
            longitude: -46.63,
            accuracy: 5.0,
            last_update: Utc::now(),
            battery_level: Some(90.0),
        }
        .into_vehicle(Uuid::new_v4())
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(VehicleStatus::derive(Ignition::Off, 10.0), VehicleStatus::Moving);
        assert_eq!(VehicleStatus::derive(Ignition::On, 10.0), VehicleStatus::Moving);
        assert_eq!(VehicleStatus::derive(Ignition::On, 0.0), VehicleStatus::Idle);
        assert_eq!(VehicleStatus::derive(Ignition::Off, 0.0), VehicleStatus::Stopped);
    }

    #[test]
    fn test_patch_recomputes_status() {
        let vehicle = sample_vehicle();
        assert_eq!(vehicle.status, VehicleStatus::Moving);

        let patched = VehiclePatch {
            current_speed: Some(0.0),
            ignition: Some(Ignition::Off),
            ..Default::default()
        }
        .apply(&vehicle);
        assert_eq!(patched.status, VehicleStatus::Stopped);
        assert_eq!(patched.id, vehicle.id);
    }

    #[test]
    fn test_patch_keeps_untouched_fields() {
        let vehicle = sample_vehicle();
        let patched = VehiclePatch {
            name: Some("Truck 7".to_string()),
            heading: Some(450.0),
            ..Default::default()
        }
        .apply(&vehicle);

        assert_eq!(patched.name, "Truck 7");
        assert_eq!(patched.heading, 90.0);
        assert_eq!(patched.license_plate, vehicle.license_plate);
        assert_eq!(patched.battery_level, Some(90.0));
        assert_eq!(patched.status, vehicle.status);
    }

    #[test]
    fn test_vehicle_serializes_camel_case() {
        let value = serde_json::to_value(sample_vehicle()).unwrap();
        assert_eq!(value["licensePlate"], "ABC-123");
        assert_eq!(value["status"], "moving");
        assert_eq!(value["ignition"], "on");
        assert!(value.get("speedLimit").is_some());
        assert!(value.get("model").is_none());
    }
}
