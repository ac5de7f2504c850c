//! Rutas HTTP
//!
//! Ensambla el router de Axum con todas las rutas del núcleo de rastreo.

pub mod report_routes;
pub mod tracking_routes;
pub mod vehicle_routes;
pub mod ws_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/tracking", tracking_routes::create_tracking_router(state.clone()))
        .nest("/api/vehicles", vehicle_routes::create_vehicle_router())
        .nest("/api/trips", report_routes::create_trip_router())
        .nest("/api/reports", report_routes::create_report_router())
        .nest("/ws", ws_routes::create_ws_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Endpoint de salud
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
