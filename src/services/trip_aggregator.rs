//! Agregador de trayectos
//!
//! Convierte el flujo de puntos de cada vehículo en registros `Trip`.
//! Cada vehículo tiene su propio mutex asíncrono: los puntos de un mismo
//! vehículo se serializan y los de vehículos distintos no compiten entre sí.
//! Un vehículo cerrado con `close` queda retirado: los puntos que lleguen
//! después para ese id se rechazan en lugar de abrir un trayecto nuevo.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{LocationPoint, Trip};
use crate::repositories::TripRepository;
use crate::utils::errors::{not_found_error, AppResult};

/// Política de continuación de trayectos
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TripPolicy {
    /// Hueco máximo entre el último punto y el nuevo; `None` continúa siempre
    pub max_gap: Option<Duration>,
}

impl TripPolicy {
    pub fn from_minutes(minutes: Option<i64>) -> Self {
        Self {
            max_gap: minutes.map(Duration::minutes),
        }
    }

    fn continues(&self, trip: &Trip, point: &LocationPoint) -> bool {
        if trip.is_closed() {
            return false;
        }
        match self.max_gap {
            Some(gap) => point.timestamp - trip.end_time <= gap,
            None => true,
        }
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<Trip>>>;

pub struct TripAggregator {
    repository: Arc<dyn TripRepository>,
    open_trips: Mutex<HashMap<Uuid, Slot>>,
    /// vehículos eliminados; sus ids (v4) no se reutilizan
    retired: Mutex<HashSet<Uuid>>,
    policy: TripPolicy,
}

impl TripAggregator {
    pub fn new(repository: Arc<dyn TripRepository>, policy: TripPolicy) -> Self {
        Self {
            repository,
            open_trips: Mutex::new(HashMap::new()),
            retired: Mutex::new(HashSet::new()),
            policy,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        self.open_trips
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn slot(&self, vehicle_id: Uuid) -> Slot {
        Arc::clone(self.slots().entry(vehicle_id).or_default())
    }

    fn retired(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        self.retired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Añade un punto al trayecto abierto del vehículo (o abre uno nuevo).
    /// `violation_limit` registra además un evento `speed_violation` en el punto.
    pub async fn append(
        &self,
        vehicle_id: Uuid,
        point: LocationPoint,
        violation_limit: Option<f64>,
    ) -> AppResult<Trip> {
        let slot = self.slot(vehicle_id);
        let mut open = slot.lock().await;

        // se comprueba con el slot tomado: `close` marca el id bajo el mismo lock
        if self.retired().contains(&vehicle_id) {
            drop(open);
            self.slots().remove(&vehicle_id);
            return Err(not_found_error("Vehicle", &vehicle_id.to_string()));
        }

        let current = match open.take() {
            Some(trip) => Some(trip),
            None => self.repository.latest_for_vehicle(vehicle_id).await?,
        };

        let mut trip = match current {
            Some(mut trip) if self.policy.continues(&trip, &point) => {
                trip.push_point(point.clone());
                trip
            }
            Some(mut previous) => {
                if !previous.is_closed() {
                    previous.close();
                    self.repository.upsert(&previous).await?;
                    info!(
                        "🏁 Trayecto {} del vehículo {} cerrado por inactividad",
                        previous.id, vehicle_id
                    );
                }
                self.start_trip(vehicle_id, point.clone())
            }
            None => self.start_trip(vehicle_id, point.clone()),
        };

        if let Some(limit) = violation_limit {
            trip.record_violation(&point, limit);
        }

        self.repository.upsert(&trip).await?;
        debug!(
            "🧭 Trayecto {}: {} puntos, {:.1} m",
            trip.id,
            trip.points.len(),
            trip.total_distance
        );

        *open = Some(trip.clone());
        Ok(trip)
    }

    fn start_trip(&self, vehicle_id: Uuid, point: LocationPoint) -> Trip {
        let trip = Trip::start(vehicle_id, point);
        info!("🚦 Nuevo trayecto {} para el vehículo {}", trip.id, vehicle_id);
        trip
    }

    /// Cierra el trayecto abierto del vehículo, si lo hay, y retira el vehículo
    pub async fn close(&self, vehicle_id: Uuid) -> AppResult<Option<Trip>> {
        let slot = self.slot(vehicle_id);
        let mut open = slot.lock().await;
        self.retired().insert(vehicle_id);

        let current = match open.take() {
            Some(trip) => Some(trip),
            None => self.repository.latest_for_vehicle(vehicle_id).await?,
        };

        let closed = match current {
            Some(mut trip) if !trip.is_closed() => {
                trip.close();
                self.repository.upsert(&trip).await?;
                info!("🏁 Trayecto {} del vehículo {} cerrado", trip.id, vehicle_id);
                Some(trip)
            }
            _ => None,
        };

        drop(open);
        self.slots().remove(&vehicle_id);
        Ok(closed)
    }

    pub async fn trips_for_vehicle(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<Trip>> {
        self.repository.find_by_vehicle(vehicle_id, start, end).await
    }
}
