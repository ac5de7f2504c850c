//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio del núcleo de rastreo:
//! vehículos, trayectos con sus puntos y eventos, e infracciones.

pub mod speed_violation;
pub mod trip;
pub mod vehicle;

pub use speed_violation::SpeedViolation;
pub use trip::{LocationPoint, RouteEvent, RouteEventType, Trip};
pub use vehicle::{Ignition, NewVehicle, Vehicle, VehiclePatch, VehicleStatus};
