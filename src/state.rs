//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. No hay estado global: cada store se
//! construye aquí y se inyecta en los handlers.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::Repositories;
use crate::services::{
    Broadcaster, IngestionDefaults, IngestionService, TripAggregator, TripPolicy,
    VehicleStateStore, ViolationDetector,
};
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub vehicles: Arc<VehicleStateStore>,
    pub trips: Arc<TripAggregator>,
    pub violations: Arc<ViolationDetector>,
    pub ingestion: Arc<IngestionService>,
}

impl AppState {
    /// Construye los servicios e hidrata el store de vehículos desde el repositorio
    pub async fn new(config: EnvironmentConfig, repositories: Repositories) -> AppResult<Self> {
        let broadcaster = Broadcaster::new(config.subscriber_buffer);
        let vehicles = Arc::new(
            VehicleStateStore::load(repositories.vehicles, broadcaster).await?,
        );
        let trips = Arc::new(TripAggregator::new(
            repositories.trips,
            TripPolicy::from_minutes(config.trip_max_gap_minutes),
        ));
        let violations = Arc::new(ViolationDetector::new(
            repositories.violations,
            config.violation_duration_seconds,
        ));
        let ingestion = Arc::new(IngestionService::new(
            vehicles.clone(),
            trips.clone(),
            violations.clone(),
            IngestionDefaults::from(&config),
        ));

        Ok(Self {
            config: Arc::new(config),
            vehicles,
            trips,
            violations,
            ingestion,
        })
    }
}
