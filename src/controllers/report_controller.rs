use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::dto::report_dto::{TripQuery, ViolationQuery};
use crate::models::{SpeedViolation, Trip};
use crate::services::{TripAggregator, ViolationDetector};
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Lecturas por rango sobre trayectos e infracciones
pub struct ReportController {
    trips: Arc<TripAggregator>,
    violations: Arc<ViolationDetector>,
}

impl ReportController {
    pub fn new(state: &AppState) -> Self {
        Self {
            trips: state.trips.clone(),
            violations: state.violations.clone(),
        }
    }

    pub async fn trips(&self, query: TripQuery) -> Result<Vec<Trip>, AppError> {
        let vehicle_id = query.vehicle_id()?;
        let range = query.range(Utc::now())?;
        debug!(
            "🔎 Trayectos de {} entre {} y {}",
            vehicle_id, range.start, range.end
        );
        self.trips
            .trips_for_vehicle(vehicle_id, range.start, range.end)
            .await
    }

    pub async fn violations(&self, query: ViolationQuery) -> Result<Vec<SpeedViolation>, AppError> {
        let range = query.range(Utc::now())?;
        debug!("🔎 Infracciones entre {} y {}", range.start, range.end);
        self.violations
            .violations_between(range.start, range.end)
            .await
    }
}
