use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::report_controller::ReportController;
use crate::dto::report_dto::{TripQuery, ViolationQuery};
use crate::models::{SpeedViolation, Trip};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_trip_router() -> Router<AppState> {
    Router::new().route("/", get(list_trips))
}

pub fn create_report_router() -> Router<AppState> {
    Router::new().route("/violations", get(list_violations))
}

async fn list_trips(
    State(state): State<AppState>,
    Query(query): Query<TripQuery>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let controller = ReportController::new(&state);
    Ok(Json(controller.trips(query).await?))
}

async fn list_violations(
    State(state): State<AppState>,
    Query(query): Query<ViolationQuery>,
) -> Result<Json<Vec<SpeedViolation>>, AppError> {
    let controller = ReportController::new(&state);
    Ok(Json(controller.violations(query).await?))
}
