//! Middleware del sistema
//!
//! Este módulo contiene el middleware de clave API de los rastreadores
//! y la configuración de CORS.

pub mod api_key;
pub mod cors;

pub use api_key::*;
pub use cors::*;
