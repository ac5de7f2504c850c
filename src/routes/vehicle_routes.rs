use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::vehicle_controller::VehicleController;
use crate::dto::api_response::ApiResponse;
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
use crate::models::Vehicle;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_vehicle_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vehicles).post(create_vehicle))
        .route(
            "/:id",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("'{}' is not a valid id", raw)))
}

async fn create_vehicle(
    State(state): State<AppState>,
    payload: Result<Json<CreateVehicleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Vehicle>>), AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let controller = VehicleController::new(&state);
    let response = controller.create(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vehicle>, AppError> {
    let controller = VehicleController::new(&state);
    let vehicle = controller.get_by_id(parse_id(&id)?).await?;
    Ok(Json(vehicle))
}

async fn list_vehicles(State(state): State<AppState>) -> Json<Vec<Vehicle>> {
    let controller = VehicleController::new(&state);
    Json(controller.list().await)
}

async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateVehicleRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vehicle>>, AppError> {
    let id = parse_id(&id)?;
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let controller = VehicleController::new(&state);
    let response = controller.update(id, request).await?;
    Ok(Json(response))
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let controller = VehicleController::new(&state);
    controller.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
