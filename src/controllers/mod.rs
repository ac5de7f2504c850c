pub mod report_controller;
pub mod vehicle_controller;
