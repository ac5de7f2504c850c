//! Núcleo de rastreo de flota
//!
//! Ingesta de telemetría GPS, estado en vivo de vehículos, trayectos,
//! detección de excesos de velocidad y difusión por WebSocket.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
