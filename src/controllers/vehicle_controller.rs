use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::config::EnvironmentConfig;
use crate::dto::api_response::ApiResponse;
use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
use crate::models::{Vehicle, VehiclePatch};
use crate::services::{TripAggregator, VehicleStateStore};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

pub struct VehicleController {
    vehicles: Arc<VehicleStateStore>,
    trips: Arc<TripAggregator>,
    config: Arc<EnvironmentConfig>,
}

impl VehicleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            vehicles: state.vehicles.clone(),
            trips: state.trips.clone(),
            config: state.config.clone(),
        }
    }

    pub async fn create(
        &self,
        request: CreateVehicleRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        request.validate()?;

        // El store rechaza la matrícula duplicada con 409
        let vehicle = self
            .vehicles
            .create(request.into_new_vehicle(&self.config))
            .await?;

        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehicle created successfully".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Vehicle, AppError> {
        self.vehicles
            .get(id)
            .await
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }

    pub async fn list(&self) -> Vec<Vehicle> {
        self.vehicles.list().await
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateVehicleRequest,
    ) -> Result<ApiResponse<Vehicle>, AppError> {
        request.validate()?;
        let vehicle = self
            .vehicles
            .update(id, VehiclePatch::from(request))
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))?;

        Ok(ApiResponse::success_with_message(
            vehicle,
            "Vehicle updated successfully".to_string(),
        ))
    }

    /// Elimina el vehículo y cierra su trayecto abierto
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.vehicles.delete(id).await? {
            return Err(not_found_error("Vehicle", &id.to_string()));
        }

        if let Err(e) = self.trips.close(id).await {
            warn!("⚠️ No se pudo cerrar el trayecto del vehículo {}: {}", id, e);
        }
        Ok(())
    }
}
