//! Middleware de clave API de los rastreadores
//!
//! Comprueba el header `x-api-key` antes de leer el cuerpo y antes de tocar
//! cualquier store.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Comparación sin cortocircuito por contenido
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Verifica una clave recibida contra la configurada
pub fn check_api_key(configured: Option<&str>, provided: Option<&str>) -> AppResult<()> {
    let Some(expected) = configured else {
        error!("❌ TRACKING_API_KEY no configurada: ingesta deshabilitada");
        return Err(AppError::ServiceUnavailable(
            "Tracking API key is not configured".to_string(),
        ));
    };

    match provided {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => Ok(()),
        Some(_) => {
            warn!("🔒 Muestra rechazada: clave API inválida");
            Err(AppError::Unauthorized("Invalid API key".to_string()))
        }
        None => {
            warn!("🔒 Muestra rechazada: falta el header {}", API_KEY_HEADER);
            Err(AppError::Unauthorized("Missing API key".to_string()))
        }
    }
}

/// Middleware de autenticación de la ingesta
pub async fn require_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let provided = headers.get(API_KEY_HEADER).and_then(|h| h.to_str().ok());
    check_api_key(state.config.tracking_api_key.as_deref(), provided)?;
    Ok(next.run(request).await)
}
