//! Services module
//!
//! Este módulo contiene la lógica de negocio del núcleo de rastreo: estado
//! de vehículos, ingesta de telemetría, trayectos, infracciones y difusión
//! en vivo.

pub mod broadcaster;
pub mod ingestion_service;
pub mod trip_aggregator;
pub mod vehicle_state_service;
pub mod violation_detector;

pub use broadcaster::{Broadcaster, LiveMessage, Subscription, VehicleSnapshot};
pub use ingestion_service::{IngestionDefaults, IngestionService};
pub use trip_aggregator::{TripAggregator, TripPolicy};
pub use vehicle_state_service::VehicleStateStore;
pub use violation_detector::ViolationDetector;
