use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::parse_datetime;

// Query de trayectos: /api/trips?vehicleId&startDate&endDate
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripQuery {
    pub vehicle_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// Query de infracciones: /api/reports/violations?startDate&endDate
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Rango temporal cerrado `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Resuelve el rango; sin fechas usa `[end - default_span, now]`
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        default_span: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let end = match end {
            Some(value) => parse_date("endDate", value)?,
            None => now,
        };
        let start = match start {
            Some(value) => parse_date("startDate", value)?,
            None => end - default_span,
        };
        if start > end {
            return Err(AppError::BadRequest(
                "startDate must not be after endDate".to_string(),
            ));
        }
        Ok(Self { start, end })
    }
}

fn parse_date(field: &str, value: &str) -> AppResult<DateTime<Utc>> {
    parse_datetime(value)
        .map_err(|_| AppError::BadRequest(format!("{} must be an RFC 3339 timestamp", field)))
}

impl TripQuery {
    pub fn vehicle_id(&self) -> AppResult<Uuid> {
        let raw = self
            .vehicle_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("vehicleId is required".to_string()))?;
        Uuid::parse_str(raw)
            .map_err(|_| AppError::BadRequest(format!("vehicleId '{}' is not a valid id", raw)))
    }

    pub fn range(&self, now: DateTime<Utc>) -> AppResult<DateRange> {
        DateRange::resolve(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            Duration::hours(24),
            now,
        )
    }
}

impl ViolationQuery {
    pub fn range(&self, now: DateTime<Utc>) -> AppResult<DateRange> {
        DateRange::resolve(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            Duration::days(30),
            now,
        )
    }
}
