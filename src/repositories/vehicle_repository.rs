use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::pg_types::{to_decimal, to_f64};
use super::VehicleRepository;
use crate::models::{Ignition, Vehicle, VehicleStatus};
use crate::utils::errors::{persistence_error, AppResult};

// Fila tal como vive en la tabla vehicles
#[derive(Debug, sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    name: String,
    license_plate: String,
    model: Option<String>,
    status: String,
    ignition: String,
    current_speed: f64,
    speed_limit: f64,
    heading: f64,
    latitude: Decimal,
    longitude: Decimal,
    accuracy: Decimal,
    last_update: DateTime<Utc>,
    battery_level: Option<f64>,
}

impl From<VehicleRow> for Vehicle {
    fn from(row: VehicleRow) -> Self {
        let ignition = Ignition::parse(&row.ignition).unwrap_or_default();
        Vehicle {
            id: row.id,
            name: row.name,
            license_plate: row.license_plate,
            model: row.model,
            status: VehicleStatus::parse(&row.status)
                .unwrap_or_else(|| VehicleStatus::derive(ignition, row.current_speed)),
            ignition,
            current_speed: row.current_speed,
            speed_limit: row.speed_limit,
            heading: row.heading,
            latitude: to_f64(row.latitude),
            longitude: to_f64(row.longitude),
            accuracy: to_f64(row.accuracy),
            last_update: row.last_update,
            battery_level: row.battery_level,
        }
    }
}

pub struct PgVehicleRepository {
    pool: PgPool,
}

impl PgVehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleRepository for PgVehicleRepository {
    async fn find_all(&self) -> AppResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            r#"
            SELECT id, name, license_plate, model, status, ignition, current_speed, speed_limit,
                   heading, latitude, longitude, accuracy, last_update, battery_level
            FROM vehicles
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| persistence_error("listing vehicles", e))?;

        Ok(rows.into_iter().map(Vehicle::from).collect())
    }

    async fn save(&self, vehicle: &Vehicle) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, name, license_plate, model, status, ignition, current_speed,
                                  speed_limit, heading, latitude, longitude, accuracy, last_update,
                                  battery_level, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, NOW())
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                license_plate = EXCLUDED.license_plate,
                model = EXCLUDED.model,
                status = EXCLUDED.status,
                ignition = EXCLUDED.ignition,
                current_speed = EXCLUDED.current_speed,
                speed_limit = EXCLUDED.speed_limit,
                heading = EXCLUDED.heading,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                accuracy = EXCLUDED.accuracy,
                last_update = EXCLUDED.last_update,
                battery_level = EXCLUDED.battery_level,
                updated_at = NOW()
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.name)
        .bind(&vehicle.license_plate)
        .bind(&vehicle.model)
        .bind(vehicle.status.as_str())
        .bind(vehicle.ignition.as_str())
        .bind(vehicle.current_speed)
        .bind(vehicle.speed_limit)
        .bind(vehicle.heading)
        .bind(to_decimal(vehicle.latitude, "latitude")?)
        .bind(to_decimal(vehicle.longitude, "longitude")?)
        .bind(to_decimal(vehicle.accuracy, "accuracy")?)
        .bind(vehicle.last_update)
        .bind(vehicle.battery_level)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence_error("saving vehicle", e))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence_error("deleting vehicle", e))?;

        Ok(result.rows_affected() > 0)
    }
}
