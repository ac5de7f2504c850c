//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos. Las firmas `fn(&T) -> Result<(), ValidationError>`
//! se usan desde `#[validate(custom = "...")]`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::ValidationError;

/// Validar y convertir string a datetime (RFC 3339 / ISO-8601)
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            let mut error = ValidationError::new("datetime");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"RFC3339".to_string());
            error
        })
}

/// Validar que un timestamp sea RFC 3339
pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    parse_datetime(value).map(|_| ())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar el estado de ignición ("on" | "off")
pub fn validate_ignition(value: &str) -> Result<(), ValidationError> {
    validate_enum(value, &["on", "off"])
}

/// Validar que un valor esté en una lista de valores permitidos
pub fn validate_enum<T: PartialEq + std::fmt::Debug + Serialize>(
    value: T,
    allowed_values: &[T],
) -> Result<(), ValidationError> {
    if !allowed_values.contains(&value) {
        let mut error = ValidationError::new("enum");
        error.add_param("value".into(), &value);
        error.add_param("allowed_values".into(), &format!("{:?}", allowed_values));
        return Err(error);
    }
    Ok(())
}
