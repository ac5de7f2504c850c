use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::post,
    Json, Router,
};

use crate::dto::tracking_dto::{TrackingRequest, TrackingResponse};
use crate::middleware::api_key::require_api_key;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Ingesta de telemetría; la clave API se comprueba antes de leer el cuerpo
pub fn create_tracking_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(ingest_sample))
        .route_layer(middleware::from_fn_with_state(state, require_api_key))
}

async fn ingest_sample(
    State(state): State<AppState>,
    payload: Result<Json<TrackingRequest>, JsonRejection>,
) -> Result<Json<TrackingResponse>, AppError> {
    let Json(sample) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let vehicle = state.ingestion.ingest(sample).await?;
    Ok(Json(TrackingResponse::accepted(vehicle)))
}
