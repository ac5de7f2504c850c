//! Conversión entre f64 y las columnas NUMERIC de PostgreSQL

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::utils::errors::{persistence_error, AppResult};

pub fn to_decimal(value: f64, field: &str) -> AppResult<Decimal> {
    Decimal::from_f64_retain(value)
        .ok_or_else(|| persistence_error("converting to NUMERIC", format!("invalid {}: {}", field, value)))
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}
