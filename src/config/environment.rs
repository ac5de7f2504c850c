//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y los parámetros del
//! núcleo de rastreo (clave de los rastreadores, valores por defecto,
//! política de trayectos).

use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Errores al leer la configuración
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Backend de persistencia
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            _ => Err(()),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub log_level: tracing::Level,
    /// Clave pre-compartida de los rastreadores (header x-api-key)
    pub tracking_api_key: Option<String>,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub default_speed_limit: f64,
    pub default_accuracy: f64,
    pub dwell_radius_meters: f64,
    pub violation_duration_seconds: i32,
    /// Sin valor: el último trayecto continúa sin importar el tiempo transcurrido
    pub trip_max_gap_minutes: Option<i64>,
    pub subscriber_buffer: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 5000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            log_level: tracing::Level::DEBUG,
            tracking_api_key: None,
            storage: StorageBackend::Memory,
            database_url: None,
            default_speed_limit: 80.0,
            default_accuracy: 5.0,
            dwell_radius_meters: 1000.0,
            violation_duration_seconds: 10,
            trip_max_gap_minutes: None,
            subscriber_buffer: 16,
        }
    }
}

fn var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde el entorno (tras `dotenvy::dotenv()`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let storage = match var("STORAGE_TYPE") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name: "STORAGE_TYPE", value })?,
            None => defaults.storage,
        };
        let database_url = var("DATABASE_URL");
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let trip_max_gap_minutes = match var("TRIP_MAX_GAP_MINUTES") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or(ConfigError::InvalidValue { name: "TRIP_MAX_GAP_MINUTES", value })?,
            ),
            None => None,
        };

        let subscriber_buffer = parse_var("SUBSCRIBER_BUFFER", defaults.subscriber_buffer)?;
        if subscriber_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SUBSCRIBER_BUFFER",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT", defaults.port)?,
            host: var("HOST").unwrap_or(defaults.host),
            cors_origins: var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_level: parse_var("LOG_LEVEL", defaults.log_level)?,
            tracking_api_key: var("TRACKING_API_KEY"),
            storage,
            database_url,
            default_speed_limit: parse_var("DEFAULT_SPEED_LIMIT", defaults.default_speed_limit)?,
            default_accuracy: parse_var("DEFAULT_ACCURACY", defaults.default_accuracy)?,
            dwell_radius_meters: parse_var("DWELL_RADIUS_METERS", defaults.dwell_radius_meters)?,
            violation_duration_seconds: parse_var(
                "VIOLATION_DURATION_SECONDS",
                defaults.violation_duration_seconds,
            )?,
            trip_max_gap_minutes,
            subscriber_buffer,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
