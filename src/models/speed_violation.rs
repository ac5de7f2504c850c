//! Modelo de SpeedViolation
//!
//! Registro independiente de un exceso de velocidad. Se crea una vez por
//! muestra que supera el límite y nunca se modifica.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpeedViolation {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub vehicle_name: String,
    pub speed: f64,
    pub speed_limit: f64,
    pub excess_speed: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Duración estimada en segundos
    pub duration: i32,
}
