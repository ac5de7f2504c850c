//! Detector de excesos de velocidad
//!
//! Decisión pura `speed > limit` y construcción del registro. No hay
//! agrupación: cada muestra por encima del límite genera su propio registro.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::models::{LocationPoint, SpeedViolation, Vehicle};
use crate::repositories::SpeedViolationRepository;
use crate::utils::errors::AppResult;

/// Devuelve el exceso (km/h) si la velocidad supera el límite
pub fn evaluate(speed: f64, speed_limit: f64) -> Option<f64> {
    (speed > speed_limit).then(|| speed - speed_limit)
}

pub struct ViolationDetector {
    repository: Arc<dyn SpeedViolationRepository>,
    duration_seconds: i32,
}

impl ViolationDetector {
    pub fn new(repository: Arc<dyn SpeedViolationRepository>, duration_seconds: i32) -> Self {
        Self {
            repository,
            duration_seconds,
        }
    }

    /// Construye el registro si el punto supera el límite del vehículo
    pub fn build(&self, vehicle: &Vehicle, point: &LocationPoint) -> Option<SpeedViolation> {
        let excess_speed = evaluate(point.speed, vehicle.speed_limit)?;
        Some(SpeedViolation {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            vehicle_name: vehicle.name.clone(),
            speed: point.speed,
            speed_limit: vehicle.speed_limit,
            excess_speed,
            latitude: point.latitude,
            longitude: point.longitude,
            timestamp: point.timestamp,
            duration: self.duration_seconds,
        })
    }

    pub async fn record(&self, violation: &SpeedViolation) -> AppResult<()> {
        self.repository.insert(violation).await?;
        info!(
            "🚨 Exceso de velocidad: {} a {:.1} km/h (límite {:.1}, +{:.1})",
            violation.vehicle_name, violation.speed, violation.speed_limit, violation.excess_speed
        );
        Ok(())
    }

    pub async fn violations_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<SpeedViolation>> {
        self.repository.find_between(start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ignition, NewVehicle};
    use crate::repositories::InMemorySpeedViolationRepository;
    use chrono::Duration;

    fn vehicle(limit: f64) -> Vehicle {
        NewVehicle {
            name: "Vehicle ABC-123".to_string(),
            license_plate: "ABC-123".to_string(),
            model: None,
            ignition: Ignition::On,
            current_speed: 0.0,
            speed_limit: limit,
            heading: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            accuracy: 5.0,
            last_update: Utc::now(),
            battery_level: None,
        }
        .into_vehicle(Uuid::new_v4())
    }

    fn point(speed: f64) -> LocationPoint {
        LocationPoint {
            latitude: -23.55,
            longitude: -46.63,
            speed,
            heading: 90.0,
            timestamp: Utc::now(),
            accuracy: Some(5.0),
            radius: None,
        }
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(95.0, 80.0), Some(15.0));
        assert_eq!(evaluate(80.0, 80.0), None);
        assert_eq!(evaluate(0.0, 80.0), None);
    }

    #[test]
    fn test_build_violation_record() {
        let detector = ViolationDetector::new(Arc::new(InMemorySpeedViolationRepository::new()), 10);
        let vehicle = vehicle(80.0);
        let sample = point(95.0);

        let violation = detector.build(&vehicle, &sample).unwrap();
        assert_eq!(violation.vehicle_id, vehicle.id);
        assert_eq!(violation.vehicle_name, "Vehicle ABC-123");
        assert_eq!(violation.excess_speed, 15.0);
        assert_eq!(violation.speed_limit, 80.0);
        assert_eq!(violation.duration, 10);
        assert_eq!(violation.timestamp, sample.timestamp);

        assert!(detector.build(&vehicle, &point(60.0)).is_none());
    }

    #[tokio::test]
    async fn test_every_sample_is_recorded() {
        let detector = ViolationDetector::new(Arc::new(InMemorySpeedViolationRepository::new()), 10);
        let vehicle = vehicle(80.0);

        for _ in 0..3 {
            let violation = detector.build(&vehicle, &point(100.0)).unwrap();
            detector.record(&violation).await.unwrap();
        }

        let now = Utc::now();
        let found = detector
            .violations_between(now - Duration::minutes(1), now)
            .await
            .unwrap();
        assert_eq!(found.len(), 3);
    }
}
