//! DTOs (Data Transfer Objects)
//!
//! Estructuras de request/response de la API HTTP.

pub mod api_response;
pub mod report_dto;
pub mod tracking_dto;
pub mod vehicle_dto;

pub use api_response::ApiResponse;
pub use report_dto::{DateRange, TripQuery, ViolationQuery};
pub use tracking_dto::{TrackingRequest, TrackingResponse};
pub use vehicle_dto::{CreateVehicleRequest, UpdateVehicleRequest};
