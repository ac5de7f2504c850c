//! Repositorios en memoria
//!
//! Backend por defecto (`STORAGE_TYPE=memory`) y el usado por los tests.
//! Los datos se pierden al reiniciar el proceso.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SpeedViolationRepository, TripRepository, VehicleRepository};
use crate::models::{SpeedViolation, Trip, Vehicle};
use crate::utils::errors::AppResult;

#[derive(Default)]
pub struct InMemoryVehicleRepository {
    vehicles: RwLock<HashMap<Uuid, Vehicle>>,
}

impl InMemoryVehicleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleRepository for InMemoryVehicleRepository {
    async fn find_all(&self) -> AppResult<Vec<Vehicle>> {
        Ok(self.vehicles.read().await.values().cloned().collect())
    }

    async fn save(&self, vehicle: &Vehicle) -> AppResult<()> {
        self.vehicles.write().await.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.vehicles.write().await.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryTripRepository {
    trips: RwLock<HashMap<Uuid, Trip>>,
}

impl InMemoryTripRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripRepository for InMemoryTripRepository {
    async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<Trip>> {
        let trips = self.trips.read().await;
        Ok(trips
            .values()
            .filter(|t| t.vehicle_id == vehicle_id)
            .max_by_key(|t| (t.start_time, t.end_time))
            .cloned())
    }

    async fn upsert(&self, trip: &Trip) -> AppResult<()> {
        self.trips.write().await.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn find_by_vehicle(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Trip>> {
        let trips = self.trips.read().await;
        let mut found: Vec<Trip> = trips
            .values()
            .filter(|t| t.vehicle_id == vehicle_id && t.start_time >= start && t.end_time <= end)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemorySpeedViolationRepository {
    violations: RwLock<Vec<SpeedViolation>>,
}

impl InMemorySpeedViolationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpeedViolationRepository for InMemorySpeedViolationRepository {
    async fn insert(&self, violation: &SpeedViolation) -> AppResult<()> {
        self.violations.write().await.push(violation.clone());
        Ok(())
    }

    async fn find_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<SpeedViolation>> {
        let violations = self.violations.read().await;
        let mut found: Vec<SpeedViolation> = violations
            .iter()
            .filter(|v| v.timestamp >= start && v.timestamp <= end)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }
}
