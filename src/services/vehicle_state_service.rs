//! Store de estado de vehículos
//!
//! Mapa autoritativo en memoria del estado actual de cada vehículo,
//! indexado por id y por matrícula. Todas las mutaciones pasan por un único
//! `RwLock`, se persisten primero en el repositorio (write-through) y
//! disparan exactamente una notificación con la lista completa.
//!
//! Las operaciones de administración (`create`, `update`) rechazan una
//! matrícula ya usada por otro vehículo dentro del mismo write lock. La
//! ingesta (`upsert_by_plate`) tolera duplicados heredados: la asociación
//! más reciente gana.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{NewVehicle, Vehicle, VehiclePatch};
use crate::repositories::VehicleRepository;
use crate::services::broadcaster::{Broadcaster, Subscription};
use crate::utils::errors::{conflict_error, AppResult};

#[derive(Default)]
struct StoreInner {
    vehicles: HashMap<Uuid, Vehicle>,
    /// ids asociados a cada matrícula, en orden de asociación
    by_plate: HashMap<String, Vec<Uuid>>,
}

impl StoreInner {
    /// Error si la matrícula pertenece a un vehículo distinto de `owner`
    fn ensure_plate_free(&self, plate: &str, owner: Option<Uuid>) -> AppResult<()> {
        match self.resolve_plate(plate) {
            Some(other) if Some(other.id) != owner => {
                Err(conflict_error("Vehicle", "license plate", plate))
            }
            _ => Ok(()),
        }
    }

    fn resolve_plate(&self, plate: &str) -> Option<&Vehicle> {
        self.by_plate
            .get(plate)?
            .iter()
            .rev()
            .find_map(|id| self.vehicles.get(id))
    }

    fn associate(&mut self, plate: &str, id: Uuid) {
        let ids = self.by_plate.entry(plate.to_string()).or_default();
        ids.retain(|existing| *existing != id);
        ids.push(id);
    }

    fn dissociate(&mut self, plate: &str, id: Uuid) {
        if let Some(ids) = self.by_plate.get_mut(plate) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                self.by_plate.remove(plate);
            }
        }
    }

    /// Inserta o reemplaza manteniendo el índice de matrículas coherente
    fn put(&mut self, vehicle: Vehicle) {
        if let Some(previous) = self.vehicles.get(&vehicle.id) {
            if previous.license_plate != vehicle.license_plate {
                let old_plate = previous.license_plate.clone();
                self.dissociate(&old_plate, vehicle.id);
                self.associate(&vehicle.license_plate, vehicle.id);
            }
        } else {
            self.associate(&vehicle.license_plate, vehicle.id);
        }
        self.vehicles.insert(vehicle.id, vehicle);
    }

    fn remove(&mut self, id: Uuid) -> Option<Vehicle> {
        let removed = self.vehicles.remove(&id)?;
        self.dissociate(&removed.license_plate, id);
        Some(removed)
    }

    fn list(&self) -> Vec<Vehicle> {
        let mut vehicles: Vec<Vehicle> = self.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.license_plate.cmp(&b.license_plate))
                .then_with(|| a.id.cmp(&b.id))
        });
        vehicles
    }
}

pub struct VehicleStateStore {
    inner: RwLock<StoreInner>,
    repository: Arc<dyn VehicleRepository>,
    broadcaster: Broadcaster,
}

impl VehicleStateStore {
    pub fn new(repository: Arc<dyn VehicleRepository>, broadcaster: Broadcaster) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            repository,
            broadcaster,
        }
    }

    /// Crea el store hidratado con lo que ya tiene el repositorio
    pub async fn load(
        repository: Arc<dyn VehicleRepository>,
        broadcaster: Broadcaster,
    ) -> AppResult<Self> {
        let existing = repository.find_all().await?;
        let store = Self::new(repository, broadcaster);
        {
            let mut inner = store.inner.write().await;
            // orden por last_update: la matrícula duplicada más reciente gana
            let mut existing = existing;
            existing.sort_by_key(|v| v.last_update);
            for vehicle in existing {
                inner.put(vehicle);
            }
            info!("🚗 {} vehículos cargados en memoria", inner.vehicles.len());
        }
        Ok(store)
    }

    pub async fn get(&self, id: Uuid) -> Option<Vehicle> {
        self.inner.read().await.vehicles.get(&id).cloned()
    }

    pub async fn get_by_plate(&self, plate: &str) -> Option<Vehicle> {
        self.inner.read().await.resolve_plate(plate).cloned()
    }

    pub async fn list(&self) -> Vec<Vehicle> {
        self.inner.read().await.list()
    }

    /// Resuelve por matrícula y escribe el resultado de `build` de forma atómica.
    /// `build` recibe el vehículo actual (o `None`) y devuelve el registro final;
    /// si el id devuelto no existe se trata como creación.
    pub async fn upsert_by_plate<F>(&self, plate: &str, build: F) -> AppResult<Vehicle>
    where
        F: FnOnce(Option<&Vehicle>) -> Vehicle,
    {
        let mut inner = self.inner.write().await;
        let vehicle = build(inner.resolve_plate(plate));

        self.repository.save(&vehicle).await?;
        inner.put(vehicle.clone());
        self.notify(&inner);

        Ok(vehicle)
    }

    pub async fn create(&self, new_vehicle: NewVehicle) -> AppResult<Vehicle> {
        let vehicle = new_vehicle.into_vehicle(Uuid::new_v4());
        let mut inner = self.inner.write().await;
        inner.ensure_plate_free(&vehicle.license_plate, None)?;

        self.repository.save(&vehicle).await?;
        inner.put(vehicle.clone());
        self.notify(&inner);

        info!("🆕 Vehículo {} creado ({})", vehicle.id, vehicle.license_plate);
        Ok(vehicle)
    }

    /// `Ok(None)` si el id no existe; en ese caso no hay notificación.
    /// Renombrar a la matrícula de otro vehículo devuelve `Conflict`.
    pub async fn update(&self, id: Uuid, patch: VehiclePatch) -> AppResult<Option<Vehicle>> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.vehicles.get(&id) else {
            return Ok(None);
        };
        let updated = patch.apply(current);
        if updated.license_plate != current.license_plate {
            inner.ensure_plate_free(&updated.license_plate, Some(id))?;
        }

        self.repository.save(&updated).await?;
        inner.put(updated.clone());
        self.notify(&inner);

        Ok(Some(updated))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.vehicles.contains_key(&id) {
            return Ok(false);
        }

        self.repository.delete(id).await?;
        inner.remove(id);
        self.notify(&inner);

        info!("🗑️ Vehículo {} eliminado", id);
        Ok(true)
    }

    /// Suscripción con snapshot inicial igual a `list()`. El read lock
    /// garantiza que ninguna mutación se intercale entre snapshot y registro.
    pub async fn subscribe(&self) -> Subscription {
        let inner = self.inner.read().await;
        self.broadcaster.subscribe(Arc::new(inner.list()))
    }

    // se llama con el write lock tomado: pushes y snapshots quedan totalmente ordenados
    fn notify(&self, inner: &StoreInner) {
        let vehicles = inner.list();
        debug!("📢 Notificando {} vehículos", vehicles.len());
        self.broadcaster.publish(vehicles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ignition, VehicleStatus};
    use crate::repositories::InMemoryVehicleRepository;
    use crate::utils::errors::{persistence_error, AppError};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    struct FailingRepository;

    #[async_trait]
    impl VehicleRepository for FailingRepository {
        async fn find_all(&self) -> AppResult<Vec<Vehicle>> {
            Ok(Vec::new())
        }
        async fn save(&self, _vehicle: &Vehicle) -> AppResult<()> {
            Err(persistence_error("saving vehicle", "connection refused"))
        }
        async fn delete(&self, _id: Uuid) -> AppResult<bool> {
            Err(persistence_error("deleting vehicle", "connection refused"))
        }
    }

    fn new_vehicle(plate: &str) -> NewVehicle {
        NewVehicle {
            name: format!("Vehicle {}", plate),
            license_plate: plate.to_string(),
            model: None,
            ignition: Ignition::Off,
            current_speed: 0.0,
            speed_limit: 80.0,
            heading: 0.0,
            latitude: -23.55,
            longitude: -46.63,
            accuracy: 5.0,
            last_update: Utc::now(),
            battery_level: None,
        }
    }

    fn store() -> (VehicleStateStore, Broadcaster) {
        let hub = Broadcaster::new(16);
        let store = VehicleStateStore::new(Arc::new(InMemoryVehicleRepository::new()), hub.clone());
        (store, hub)
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let (store, _hub) = store();
        let created = store.create(new_vehicle("ABC-123")).await.unwrap();

        assert_eq!(store.get(created.id).await, Some(created.clone()));
        assert_eq!(store.get_by_plate("ABC-123").await, Some(created.clone()));
        assert_eq!(store.list().await, vec![created]);
        assert!(store.get_by_plate("ZZZ-999").await.is_none());
    }

    #[tokio::test]
    async fn test_every_mutation_notifies_once() {
        let (store, _hub) = store();
        let mut sub = store.subscribe().await;
        assert!(sub.recv().await.unwrap().is_empty());

        let created = store.create(new_vehicle("ABC-123")).await.unwrap();
        assert_eq!(sub.try_recv().unwrap().len(), 1);
        assert!(sub.try_recv().is_none());

        store
            .update(created.id, VehiclePatch { name: Some("Truck".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(sub.try_recv().unwrap()[0].name, "Truck");

        assert!(store.delete(created.id).await.unwrap());
        assert!(sub.try_recv().unwrap().is_empty());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_and_silent() {
        let (store, _hub) = store();
        let mut sub = store.subscribe().await;
        sub.recv().await;

        assert!(store.update(Uuid::new_v4(), VehiclePatch::default()).await.unwrap().is_none());
        assert!(!store.delete(Uuid::new_v4()).await.unwrap());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_upsert_by_plate_creates_then_updates() {
        let (store, _hub) = store();
        let first = store
            .upsert_by_plate("ABC-123", |existing| {
                assert!(existing.is_none());
                new_vehicle("ABC-123").into_vehicle(Uuid::new_v4())
            })
            .await
            .unwrap();

        let second = store
            .upsert_by_plate("ABC-123", |existing| {
                let mut vehicle = existing.cloned().unwrap();
                vehicle.current_speed = 42.0;
                vehicle.status = VehicleStatus::Moving;
                vehicle
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.list().await.len(), 1);
        assert_eq!(store.get(first.id).await.unwrap().current_speed, 42.0);
    }

    #[tokio::test]
    async fn test_plate_resolves_to_most_recent_association() {
        let (store, _hub) = store();
        let older = store.create(new_vehicle("DUP-001")).await.unwrap();
        // la ingesta puede asociar un segundo id a la misma matrícula
        let newer = store
            .upsert_by_plate("DUP-001", |_| new_vehicle("DUP-001").into_vehicle(Uuid::new_v4()))
            .await
            .unwrap();
        assert_ne!(newer.id, older.id);
        assert_eq!(store.get_by_plate("DUP-001").await.unwrap().id, newer.id);

        store.delete(newer.id).await.unwrap();
        assert_eq!(store.get_by_plate("DUP-001").await.unwrap().id, older.id);
    }

    #[tokio::test]
    async fn test_create_rejects_taken_plate() {
        let (store, _hub) = store();
        let mut sub = store.subscribe().await;
        sub.recv().await;
        let existing = store.create(new_vehicle("ABC-123")).await.unwrap();
        assert!(sub.try_recv().is_some());

        let result = store.create(new_vehicle("ABC-123")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.list().await, vec![existing]);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creates_with_same_plate_yield_one_vehicle() {
        let (store, _hub) = store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create(new_vehicle("RACE-02")).await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_onto_taken_plate_conflicts() {
        let (store, _hub) = store();
        let first = store.create(new_vehicle("AAA-111")).await.unwrap();
        let second = store.create(new_vehicle("BBB-222")).await.unwrap();

        let result = store
            .update(
                second.id,
                VehiclePatch { license_plate: Some("AAA-111".into()), ..Default::default() },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.get_by_plate("AAA-111").await.unwrap().id, first.id);
        assert_eq!(store.get(second.id).await.unwrap().license_plate, "BBB-222");

        // conservar la propia matrícula no es conflicto
        let kept = store
            .update(
                first.id,
                VehiclePatch { license_plate: Some("AAA-111".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert!(kept.is_some());
    }

    #[tokio::test]
    async fn test_inherited_duplicate_can_still_be_updated() {
        let (store, _hub) = store();
        let older = store.create(new_vehicle("DUP-002")).await.unwrap();
        store
            .upsert_by_plate("DUP-002", |_| new_vehicle("DUP-002").into_vehicle(Uuid::new_v4()))
            .await
            .unwrap();

        let renamed = store
            .update(older.id, VehiclePatch { name: Some("Spare".into()), ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Spare");
    }

    #[tokio::test]
    async fn test_subscribe_snapshot_matches_list() {
        let (store, _hub) = store();
        store.create(new_vehicle("SNP-002")).await.unwrap();
        store.create(new_vehicle("SNP-001")).await.unwrap();
        store
            .upsert_by_plate("SNP-003", |_| new_vehicle("SNP-003").into_vehicle(Uuid::new_v4()))
            .await
            .unwrap();

        let mut sub = store.subscribe().await;
        let snapshot = sub.recv().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.as_slice(), store.list().await.as_slice());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_rename_moves_plate_index() {
        let (store, _hub) = store();
        let vehicle = store.create(new_vehicle("OLD-111")).await.unwrap();
        store
            .update(
                vehicle.id,
                VehiclePatch { license_plate: Some("NEW-222".into()), ..Default::default() },
            )
            .await
            .unwrap();

        assert!(store.get_by_plate("OLD-111").await.is_none());
        assert_eq!(store.get_by_plate("NEW-222").await.unwrap().id, vehicle.id);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_state_untouched() {
        let hub = Broadcaster::new(16);
        let store = VehicleStateStore::new(Arc::new(FailingRepository), hub.clone());
        let mut sub = store.subscribe().await;
        sub.recv().await;

        let result = store.create(new_vehicle("ABC-123")).await;
        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert!(store.list().await.is_empty());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_load_hydrates_from_repository() {
        let repository = Arc::new(InMemoryVehicleRepository::new());
        let mut stale = new_vehicle("DUP-001").into_vehicle(Uuid::new_v4());
        stale.last_update = Utc::now() - Duration::hours(1);
        let fresh = new_vehicle("DUP-001").into_vehicle(Uuid::new_v4());
        repository.save(&fresh).await.unwrap();
        repository.save(&stale).await.unwrap();

        let store = VehicleStateStore::load(repository, Broadcaster::new(4)).await.unwrap();
        assert_eq!(store.list().await.len(), 2);
        assert_eq!(store.get_by_plate("DUP-001").await.unwrap().id, fresh.id);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_create_single_vehicle() {
        let (store, _hub) = store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .upsert_by_plate("RACE-01", |existing| match existing {
                        Some(v) => v.clone(),
                        None => new_vehicle("RACE-01").into_vehicle(Uuid::new_v4()),
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list().await.len(), 1);
    }
}
