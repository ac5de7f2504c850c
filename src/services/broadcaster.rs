//! Difusión de actualizaciones en vivo
//!
//! Registro de suscriptores con buffer acotado. `publish` nunca espera:
//! un suscriptor lento o cerrado se desconecta en lugar de frenar la ingesta.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::models::Vehicle;

/// Lista completa de vehículos compartida entre todos los suscriptores
pub type VehicleSnapshot = Arc<Vec<Vehicle>>;

/// Mensaje del canal en vivo: `{"type": "vehicles", "data": [...]}`
#[derive(Debug, Serialize)]
pub struct LiveMessage<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: &'a [Vehicle],
}

impl<'a> LiveMessage<'a> {
    pub fn vehicles(data: &'a [Vehicle]) -> Self {
        Self { kind: "vehicles", data }
    }
}

type Registry = Mutex<HashMap<u64, mpsc::Sender<VehicleSnapshot>>>;

#[derive(Clone)]
pub struct Broadcaster {
    subscribers: Arc<Registry>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
        }
    }

    /// Registra un suscriptor; `snapshot` es lo primero que recibirá
    pub fn subscribe(&self, snapshot: VehicleSnapshot) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        // el canal está vacío: el primer try_send no puede fallar por capacidad
        let _ = tx.try_send(snapshot);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let total = {
            let mut subscribers = lock(&self.subscribers);
            subscribers.insert(id, tx);
            subscribers.len()
        };
        info!("📡 Suscriptor {} conectado ({} activos)", id, total);

        Subscription {
            id,
            receiver: rx,
            registry: Arc::clone(&self.subscribers),
            active: true,
        }
    }

    /// Envía la lista a cada suscriptor; los llenos o cerrados se eliminan
    pub fn publish(&self, vehicles: Vec<Vehicle>) {
        let snapshot: VehicleSnapshot = Arc::new(vehicles);
        let mut subscribers = lock(&self.subscribers);

        subscribers.retain(|id, tx| match tx.try_send(Arc::clone(&snapshot)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("🐢 Suscriptor {} demasiado lento, desconectado", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("🔌 Suscriptor {} ya cerrado, eliminado", id);
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<VehicleSnapshot>>> {
    // ninguna sección crítica puede dejar el mapa a medias
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Suscripción activa; se da de baja al hacer drop
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<VehicleSnapshot>,
    registry: Arc<Registry>,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Siguiente snapshot; `None` cuando el hub nos desconectó
    pub async fn recv(&mut self) -> Option<VehicleSnapshot> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<VehicleSnapshot> {
        self.receiver.try_recv().ok()
    }

    /// Baja idempotente del registro
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if lock(&self.registry).remove(&self.id).is_some() {
            info!("👋 Suscriptor {} desconectado", self.id);
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
