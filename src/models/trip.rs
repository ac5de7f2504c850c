//! Modelo de Trip
//!
//! Un trayecto es la secuencia contigua de puntos de un vehículo junto con
//! sus agregados (distancia, tiempos, velocidades, paradas) y eventos.
//! Distancias en metros, tiempos en minutos, velocidades en km/h.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::geo::{distance_meters, Coordinate};

/// Observación de posición registrada dentro de un trayecto
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Radio de permanencia en metros, sólo cuando speed == 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl LocationPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn is_stationary(&self) -> bool {
        self.speed <= 0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteEventType {
    Departure,
    Arrival,
    Stop,
    SpeedViolation,
    GeofenceEntry,
    GeofenceExit,
}

/// Evento discreto dentro de un trayecto
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: RouteEventType,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Minutos detenido (eventos `stop`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geofence_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl RouteEvent {
    pub fn at(event_type: RouteEventType, point: &LocationPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            latitude: point.latitude,
            longitude: point.longitude,
            timestamp: point.timestamp,
            duration: None,
            speed: None,
            speed_limit: None,
            geofence_name: None,
            address: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_distance: f64,
    pub travel_time: f64,
    pub stopped_time: f64,
    pub average_speed: f64,
    pub max_speed: f64,
    pub stops_count: u32,
    pub points: Vec<LocationPoint>,
    pub events: Vec<RouteEvent>,
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}

impl Trip {
    /// Abre un trayecto nuevo con un único punto y un evento de salida
    pub fn start(vehicle_id: Uuid, point: LocationPoint) -> Self {
        let departure = RouteEvent::at(RouteEventType::Departure, &point);
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            start_time: point.timestamp,
            end_time: point.timestamp,
            total_distance: 0.0,
            travel_time: 0.0,
            stopped_time: 0.0,
            average_speed: point.speed,
            max_speed: point.speed,
            stops_count: 0,
            points: vec![point],
            events: vec![departure],
        }
    }

    /// Añade un punto y recalcula los agregados incrementalmente
    pub fn push_point(&mut self, point: LocationPoint) {
        if let Some(previous) = self.points.last().cloned() {
            self.total_distance += distance_meters(previous.coordinate(), point.coordinate());

            if previous.is_stationary() {
                let stopped = minutes_between(previous.timestamp, point.timestamp);
                self.stopped_time += stopped;
                if let Some(stop) = self.open_stop_event_mut() {
                    *stop.duration.get_or_insert(0.0) += stopped;
                }
            } else if point.is_stationary() {
                self.stops_count += 1;
                let mut stop = RouteEvent::at(RouteEventType::Stop, &point);
                stop.duration = Some(0.0);
                self.push_event(stop);
            }
        }

        if point.timestamp > self.end_time {
            self.end_time = point.timestamp;
        }
        self.travel_time = minutes_between(self.start_time, self.end_time);

        let hours = self.travel_time / 60.0;
        self.average_speed = if hours > 0.0 {
            (self.total_distance / 1000.0) / hours
        } else {
            point.speed
        };
        self.max_speed = self.max_speed.max(point.speed);

        self.points.push(point);
    }

    /// Registra un evento de exceso de velocidad en la posición del punto
    pub fn record_violation(&mut self, point: &LocationPoint, speed_limit: f64) {
        let mut event = RouteEvent::at(RouteEventType::SpeedViolation, point);
        event.speed = Some(point.speed);
        event.speed_limit = Some(speed_limit);
        self.push_event(event);
    }

    /// Cierra el trayecto con un evento de llegada en el último punto
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Some(last) = self.points.last().cloned() {
            self.push_event(RouteEvent::at(RouteEventType::Arrival, &last));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.events
            .iter()
            .any(|e| e.event_type == RouteEventType::Arrival)
    }

    /// La parada abierta es el último evento `stop` si el último punto sigue detenido
    fn open_stop_event_mut(&mut self) -> Option<&mut RouteEvent> {
        self.events
            .iter_mut()
            .rev()
            .find(|e| e.event_type == RouteEventType::Stop)
    }

    fn push_event(&mut self, event: RouteEvent) {
        // inserción estable: respeta el orden por timestamp aunque el punto llegue tarde
        let index = self
            .events
            .partition_point(|existing| existing.timestamp <= event.timestamp);
        self.events.insert(index, event);
    }
}
