//! Pipeline de ingesta de telemetría
//!
//! Punto de entrada por muestra: valida, resuelve el vehículo por matrícula
//! (creándolo si no existe), actualiza su estado, añade el punto al trayecto
//! y registra el exceso de velocidad si lo hay. La autenticación ocurre antes,
//! en el middleware de clave API.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::EnvironmentConfig;
use crate::dto::TrackingRequest;
use crate::models::{Ignition, LocationPoint, Vehicle, VehicleStatus};
use crate::services::trip_aggregator::TripAggregator;
use crate::services::vehicle_state_service::VehicleStateStore;
use crate::services::violation_detector::ViolationDetector;
use crate::utils::errors::AppResult;
use crate::utils::geo::normalize_heading;

/// Valores por defecto para vehículos creados por telemetría
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestionDefaults {
    pub speed_limit: f64,
    pub accuracy: f64,
    pub dwell_radius_meters: f64,
}

impl Default for IngestionDefaults {
    fn default() -> Self {
        Self {
            speed_limit: 80.0,
            accuracy: 5.0,
            dwell_radius_meters: 1000.0,
        }
    }
}

impl From<&EnvironmentConfig> for IngestionDefaults {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            speed_limit: config.default_speed_limit,
            accuracy: config.default_accuracy,
            dwell_radius_meters: config.dwell_radius_meters,
        }
    }
}

/// Ignición resultante: la declarada, o `on` si hay movimiento, o la previa
pub fn resolve_ignition(declared: Option<Ignition>, speed: f64, previous: Option<Ignition>) -> Ignition {
    match declared {
        Some(ignition) => ignition,
        None if speed > 0.0 => Ignition::On,
        None => previous.unwrap_or_default(),
    }
}

pub struct IngestionService {
    vehicles: Arc<VehicleStateStore>,
    trips: Arc<TripAggregator>,
    detector: Arc<ViolationDetector>,
    defaults: IngestionDefaults,
}

impl IngestionService {
    pub fn new(
        vehicles: Arc<VehicleStateStore>,
        trips: Arc<TripAggregator>,
        detector: Arc<ViolationDetector>,
        defaults: IngestionDefaults,
    ) -> Self {
        Self {
            vehicles,
            trips,
            detector,
            defaults,
        }
    }

    /// Procesa una muestra ya autenticada. Los errores de validación y de la
    /// escritura principal del vehículo se propagan; los de trayecto e
    /// infracción se registran y se ignoran.
    pub async fn ingest(&self, sample: TrackingRequest) -> AppResult<Vehicle> {
        sample.validate()?;

        let plate = sample.plate().to_string();
        let timestamp = sample.timestamp_or(Utc::now());
        let declared = sample.ignition();
        let defaults = self.defaults;

        let vehicle = self
            .vehicles
            .upsert_by_plate(&plate, |existing| {
                let ignition =
                    resolve_ignition(declared, sample.speed, existing.map(|v| v.ignition));
                let status = VehicleStatus::derive(ignition, sample.speed);

                match existing {
                    Some(current) => {
                        let mut updated = current.clone();
                        updated.current_speed = sample.speed;
                        updated.status = status;
                        updated.ignition = ignition;
                        updated.latitude = sample.latitude;
                        updated.longitude = sample.longitude;
                        updated.heading = sample
                            .heading
                            .map(normalize_heading)
                            .unwrap_or(current.heading);
                        updated.battery_level = sample.battery_level.or(current.battery_level);
                        updated.last_update = timestamp;
                        updated
                    }
                    None => Vehicle {
                        id: Uuid::new_v4(),
                        name: format!("Vehicle {}", plate),
                        license_plate: plate.clone(),
                        model: None,
                        status,
                        ignition,
                        current_speed: sample.speed,
                        speed_limit: defaults.speed_limit,
                        heading: sample.heading.map(normalize_heading).unwrap_or(0.0),
                        latitude: sample.latitude,
                        longitude: sample.longitude,
                        accuracy: defaults.accuracy,
                        last_update: timestamp,
                        battery_level: sample.battery_level,
                    },
                }
            })
            .await?;

        info!(
            "📍 {} en ({:.5}, {:.5}) a {:.1} km/h [{}]",
            vehicle.license_plate,
            vehicle.latitude,
            vehicle.longitude,
            vehicle.current_speed,
            vehicle.status.as_str()
        );

        let point = LocationPoint {
            latitude: sample.latitude,
            longitude: sample.longitude,
            speed: sample.speed,
            heading: vehicle.heading,
            timestamp,
            accuracy: Some(vehicle.accuracy),
            radius: (sample.speed == 0.0).then_some(defaults.dwell_radius_meters),
        };

        let violation = self.detector.build(&vehicle, &point);
        let violation_limit = violation.as_ref().map(|v| v.speed_limit);

        if let Err(e) = self.trips.append(vehicle.id, point, violation_limit).await {
            warn!("⚠️ No se pudo registrar el punto del vehículo {}: {}", vehicle.id, e);
        }

        if let Some(violation) = violation {
            if let Err(e) = self.detector.record(&violation).await {
                error!("❌ No se pudo registrar la infracción de {}: {}", vehicle.id, e);
            }
        }

        Ok(vehicle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SpeedViolation, Trip};
    use crate::repositories::{
        InMemorySpeedViolationRepository, InMemoryTripRepository, InMemoryVehicleRepository,
        SpeedViolationRepository, TripRepository,
    };
    use crate::services::broadcaster::Broadcaster;
    use crate::services::trip_aggregator::TripPolicy;
    use crate::utils::errors::{persistence_error, AppError};
    use crate::utils::geo::{distance_meters, Coordinate};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};

    struct BrokenViolations;

    #[async_trait]
    impl SpeedViolationRepository for BrokenViolations {
        async fn insert(&self, _violation: &SpeedViolation) -> AppResult<()> {
            Err(persistence_error("saving speed violation", "timeout"))
        }
        async fn find_between(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> AppResult<Vec<SpeedViolation>> {
            Ok(Vec::new())
        }
    }

    struct BrokenTrips;

    #[async_trait]
    impl TripRepository for BrokenTrips {
        async fn latest_for_vehicle(&self, _vehicle_id: Uuid) -> AppResult<Option<Trip>> {
            Err(persistence_error("loading latest trip", "timeout"))
        }
        async fn upsert(&self, _trip: &Trip) -> AppResult<()> {
            Err(persistence_error("saving trip", "timeout"))
        }
        async fn find_by_vehicle(
            &self,
            _vehicle_id: Uuid,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> AppResult<Vec<Trip>> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        service: IngestionService,
        store: Arc<VehicleStateStore>,
        trips: Arc<TripAggregator>,
        detector: Arc<ViolationDetector>,
    }

    fn harness_with(
        trips: Arc<dyn TripRepository>,
        violations: Arc<dyn SpeedViolationRepository>,
    ) -> Harness {
        let store = Arc::new(VehicleStateStore::new(
            Arc::new(InMemoryVehicleRepository::new()),
            Broadcaster::new(16),
        ));
        let trips = Arc::new(TripAggregator::new(trips, TripPolicy::default()));
        let detector = Arc::new(ViolationDetector::new(violations, 10));
        Harness {
            service: IngestionService::new(
                store.clone(),
                trips.clone(),
                detector.clone(),
                IngestionDefaults::default(),
            ),
            store,
            trips,
            detector,
        }
    }

    fn harness() -> Harness {
        harness_with(
            Arc::new(InMemoryTripRepository::new()),
            Arc::new(InMemorySpeedViolationRepository::new()),
        )
    }

    fn sample(plate: &str, lat: f64, lng: f64, speed: f64) -> TrackingRequest {
        TrackingRequest {
            license_plate: plate.to_string(),
            latitude: lat,
            longitude: lng,
            speed,
            heading: None,
            ignition: None,
            battery_level: None,
            timestamp: None,
        }
    }

    async fn violation_count(h: &Harness) -> usize {
        let now = Utc::now();
        h.detector
            .violations_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap()
            .len()
    }

    async fn trips_of(h: &Harness, vehicle_id: Uuid) -> Vec<Trip> {
        let now = Utc::now();
        h.trips
            .trips_for_vehicle(vehicle_id, now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap()
    }

    #[test]
    fn test_resolve_ignition() {
        assert_eq!(resolve_ignition(Some(Ignition::Off), 50.0, None), Ignition::Off);
        assert_eq!(resolve_ignition(None, 50.0, Some(Ignition::Off)), Ignition::On);
        assert_eq!(resolve_ignition(None, 0.0, Some(Ignition::On)), Ignition::On);
        assert_eq!(resolve_ignition(None, 0.0, None), Ignition::Off);
    }

    #[tokio::test]
    async fn test_unseen_plate_creates_moving_vehicle() {
        let h = harness();
        let vehicle = h
            .service
            .ingest(sample("ABC-123", -23.55, -46.63, 60.0))
            .await
            .unwrap();

        assert_eq!(vehicle.name, "Vehicle ABC-123");
        assert_eq!(vehicle.status, VehicleStatus::Moving);
        assert_eq!(vehicle.ignition, Ignition::On);
        assert_eq!(vehicle.speed_limit, 80.0);
        assert_eq!(vehicle.accuracy, 5.0);
        assert_eq!(h.store.list().await.len(), 1);
        assert_eq!(violation_count(&h).await, 0);
        assert_eq!(trips_of(&h, vehicle.id).await[0].points.len(), 1);
    }

    #[tokio::test]
    async fn test_speeding_sample_records_violation_and_extends_trip() {
        let h = harness();
        let first = h
            .service
            .ingest(sample("ABC-123", -23.55, -46.63, 60.0))
            .await
            .unwrap();
        let second = h
            .service
            .ingest(sample("ABC-123", -23.56, -46.64, 95.0))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let now = Utc::now();
        let violations = h
            .detector
            .violations_between(now - Duration::hours(1), now)
            .await
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].excess_speed, 15.0);

        let trip = &trips_of(&h, first.id).await[0];
        assert_eq!(trip.max_speed, 95.0);
        let expected = distance_meters(
            Coordinate::new(-23.55, -46.63),
            Coordinate::new(-23.56, -46.64),
        );
        assert!((trip.total_distance - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stationary_status_follows_ignition() {
        let h = harness();
        let mut idle = sample("IDL-001", 0.0, 0.0, 0.0);
        idle.ignition = Some("on".into());
        assert_eq!(h.service.ingest(idle).await.unwrap().status, VehicleStatus::Idle);

        let mut parked = sample("IDL-001", 0.0, 0.0, 0.0);
        parked.ignition = Some("off".into());
        assert_eq!(h.service.ingest(parked).await.unwrap().status, VehicleStatus::Stopped);

        let fresh = h.service.ingest(sample("NEW-001", 0.0, 0.0, 0.0)).await.unwrap();
        assert_eq!(fresh.status, VehicleStatus::Stopped);
        assert_eq!(fresh.ignition, Ignition::Off);
    }

    #[tokio::test]
    async fn test_moving_overrides_declared_ignition_for_status() {
        let h = harness();
        let mut sample = sample("MOV-001", 0.0, 0.0, 20.0);
        sample.ignition = Some("off".into());
        let vehicle = h.service.ingest(sample).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Moving);
        assert_eq!(vehicle.ignition, Ignition::Off);
    }

    #[tokio::test]
    async fn test_missing_heading_and_battery_keep_previous_values() {
        let h = harness();
        let mut first = sample("HDG-001", 0.0, 0.0, 10.0);
        first.heading = Some(450.0);
        first.battery_level = Some(70.0);
        let created = h.service.ingest(first).await.unwrap();
        assert_eq!(created.heading, 90.0);

        let updated = h.service.ingest(sample("HDG-001", 0.0, 0.001, 10.0)).await.unwrap();
        assert_eq!(updated.heading, 90.0);
        assert_eq!(updated.battery_level, Some(70.0));
    }

    #[tokio::test]
    async fn test_duplicate_sample_is_not_deduplicated() {
        let h = harness();
        let mut speeding = sample("DUP-001", 1.0, 1.0, 120.0);
        speeding.timestamp = Some(Utc::now().to_rfc3339());

        let vehicle = h.service.ingest(speeding.clone()).await.unwrap();
        h.service.ingest(speeding).await.unwrap();

        assert_eq!(violation_count(&h).await, 2);
        assert_eq!(trips_of(&h, vehicle.id).await[0].points.len(), 2);
    }

    #[tokio::test]
    async fn test_stationary_point_carries_dwell_radius() {
        let h = harness();
        let vehicle = h.service.ingest(sample("STP-001", 0.0, 0.0, 0.0)).await.unwrap();
        let trip = &trips_of(&h, vehicle.id).await[0];
        assert_eq!(trip.points[0].radius, Some(1000.0));
    }

    #[tokio::test]
    async fn test_invalid_sample_touches_nothing() {
        let h = harness();
        let mut subscription = h.store.subscribe().await;
        subscription.recv().await;

        let result = h.service.ingest(sample("BAD-001", 91.0, 0.0, 10.0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(h.store.list().await.is_empty());
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_secondary_failures_are_swallowed() {
        let h = harness_with(Arc::new(BrokenTrips), Arc::new(BrokenViolations));
        let vehicle = h
            .service
            .ingest(sample("ERR-001", 0.0, 0.0, 150.0))
            .await
            .unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Moving);
        assert_eq!(h.store.get(vehicle.id).await, Some(vehicle));
    }

    #[tokio::test]
    async fn test_deleted_vehicle_gets_no_new_trip() {
        let h = harness();
        let vehicle = h.service.ingest(sample("DEL-001", 0.0, 0.0, 30.0)).await.unwrap();
        assert!(h.store.delete(vehicle.id).await.unwrap());
        h.trips.close(vehicle.id).await.unwrap();

        // punto en vuelo que llega tras el borrado
        let point = LocationPoint {
            latitude: 0.0,
            longitude: 0.001,
            speed: 30.0,
            heading: 0.0,
            timestamp: Utc::now(),
            accuracy: None,
            radius: None,
        };
        assert!(h.trips.append(vehicle.id, point, None).await.is_err());
        let trips = trips_of(&h, vehicle.id).await;
        assert_eq!(trips.len(), 1);
        assert!(trips[0].is_closed());

        let reborn = h.service.ingest(sample("DEL-001", 0.0, 0.002, 30.0)).await.unwrap();
        assert_ne!(reborn.id, vehicle.id);
        assert_eq!(trips_of(&h, reborn.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_one_broadcast_per_sample() {
        let h = harness();
        let mut subscription = h.store.subscribe().await;
        subscription.recv().await;

        h.service.ingest(sample("PUB-001", 0.0, 0.0, 100.0)).await.unwrap();
        let pushed = subscription.try_recv().unwrap();
        assert_eq!(pushed[0].license_plate, "PUB-001");
        assert!(subscription.try_recv().is_none());
    }
}
