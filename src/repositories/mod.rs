//! Repositorios
//!
//! Contratos de persistencia que el núcleo necesita de sus colaboradores
//! externos, con una implementación en memoria y otra PostgreSQL (sqlx).

pub mod memory;
pub mod pg_types;
pub mod speed_violation_repository;
pub mod trip_repository;
pub mod vehicle_repository;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{SpeedViolation, Trip, Vehicle};
use crate::utils::errors::AppResult;

pub use memory::{InMemorySpeedViolationRepository, InMemoryTripRepository, InMemoryVehicleRepository};
pub use speed_violation_repository::PgSpeedViolationRepository;
pub use trip_repository::PgTripRepository;
pub use vehicle_repository::PgVehicleRepository;

/// Persistencia durable de vehículos (write-through desde el store en memoria)
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn find_all(&self) -> AppResult<Vec<Vehicle>>;
    async fn save(&self, vehicle: &Vehicle) -> AppResult<()>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Persistencia de trayectos: el registro completo se reescribe en cada punto
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<Trip>>;
    async fn upsert(&self, trip: &Trip) -> AppResult<()>;
    /// Trayectos contenidos en [start, end], más recientes primero
    async fn find_by_vehicle(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Trip>>;
}

/// Persistencia de infracciones de velocidad (sólo inserción)
#[async_trait]
pub trait SpeedViolationRepository: Send + Sync {
    async fn insert(&self, violation: &SpeedViolation) -> AppResult<()>;
    /// Infracciones con timestamp en [start, end], más recientes primero
    async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<SpeedViolation>>;
}

/// Conjunto de repositorios inyectado en el estado de la aplicación
#[derive(Clone)]
pub struct Repositories {
    pub vehicles: Arc<dyn VehicleRepository>,
    pub trips: Arc<dyn TripRepository>,
    pub violations: Arc<dyn SpeedViolationRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            vehicles: Arc::new(InMemoryVehicleRepository::new()),
            trips: Arc::new(InMemoryTripRepository::new()),
            violations: Arc::new(InMemorySpeedViolationRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            vehicles: Arc::new(PgVehicleRepository::new(pool.clone())),
            trips: Arc::new(PgTripRepository::new(pool.clone())),
            violations: Arc::new(PgSpeedViolationRepository::new(pool)),
        }
    }
}
