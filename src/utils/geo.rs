//! Utilidades geodésicas
//!
//! Funciones puras sobre coordenadas WGS84: distancia de gran círculo
//! (haversine) y normalización de rumbos.

/// Radio medio de la Tierra en kilómetros
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Coordenada geográfica en grados decimales
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Distancia de gran círculo en kilómetros
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = (to.latitude - from.latitude).to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // a puede exceder 1.0 por error de redondeo en puntos antipodales
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distancia de gran círculo en metros (unidad usada por los trayectos)
pub fn distance_meters(from: Coordinate, to: Coordinate) -> f64 {
    haversine_km(from, to) * 1000.0
}

/// Normaliza un rumbo a [0, 360)
pub fn normalize_heading(heading: f64) -> f64 {
    let normalized = heading.rem_euclid(360.0);
    // rem_euclid(-1e-18) puede devolver exactamente 360.0
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
