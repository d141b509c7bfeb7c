//! Capacity store with per-resource mutual exclusion
//!
//! One async mutex per resource, held for the whole validate-adjust-commit
//! span of a booking. Bookings against different resources never contend;
//! bookings competing for the same resource serialize on its lock. Lock
//! acquisition is bounded: a waiter that cannot get the lock within the
//! configured timeout fails with [`Error::LockTimeout`] instead of queueing
//! indefinitely.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{CapacitySnapshot, Resource, ResourceId, ResourceSpec},
};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout, Duration};

/// Durable capacity rows and their locking discipline
pub struct CapacityStore {
    storage: Arc<Storage>,
    // Map: resource_id -> lock cell, created lazily on first touch
    locks: DashMap<ResourceId, Arc<Mutex<()>>>,
    acquire_timeout: Duration,
}

impl CapacityStore {
    /// Create a store over the shared storage handle
    pub fn new(storage: Arc<Storage>, acquire_timeout: Duration) -> Self {
        Self {
            storage,
            locks: DashMap::new(),
            acquire_timeout,
        }
    }

    /// Register a new resource.
    ///
    /// The row starts fully available and active. Re-registering an existing
    /// ID fails: it would reset `available_seats` under live reservations.
    pub async fn register(&self, spec: ResourceSpec) -> Result<()> {
        let _permit = self.lock_cell(&spec.id).await?;

        if self.storage.get_resource(&spec.id)?.is_some() {
            return Err(Error::ResourceAlreadyExists(spec.id.to_string()));
        }

        let resource = spec.into_resource();
        self.storage.put_resource(&resource)?;

        tracing::info!(
            resource_id = %resource.id,
            total_seats = resource.total_seats,
            "Resource registered"
        );

        Ok(())
    }

    /// Activate or deactivate a resource.
    ///
    /// Takes the resource's exclusive lock: commits rewrite whole rows, so an
    /// unlocked flag write could be lost under a concurrent reservation.
    pub async fn set_active(&self, id: &ResourceId, active: bool) -> Result<()> {
        let mut guard = self.acquire_exclusive(id).await?;
        guard.resource.active = active;
        self.storage.put_resource(&guard.resource)?;

        tracing::info!(resource_id = %id, active, "Resource active flag updated");

        Ok(())
    }

    /// Read-only snapshot of a resource's counters.
    ///
    /// Does not take the lock; the value may be stale by the time the caller
    /// acts on it. Booking decisions re-check under the lock.
    pub fn snapshot(&self, id: &ResourceId) -> Result<CapacitySnapshot> {
        let resource = self
            .storage
            .get_resource(id)?
            .ok_or_else(|| Error::ResourceNotFound(id.to_string()))?;
        Ok(resource.snapshot())
    }

    /// Obtain exclusive access to one resource's capacity row.
    ///
    /// Suspends while another transaction holds the row, up to the configured
    /// timeout. The guard re-reads the row once the lock is held; that view
    /// is authoritative until the guard drops.
    pub async fn acquire_exclusive(&self, id: &ResourceId) -> Result<CapacityGuard> {
        // Fail fast on unknown resources without queueing on a lock
        if self.storage.get_resource(id)?.is_none() {
            return Err(Error::ResourceNotFound(id.to_string()));
        }

        let permit = self.lock_cell(id).await?;

        // Authoritative re-read now that no writer can interleave
        let resource = self
            .storage
            .get_resource(id)?
            .ok_or_else(|| Error::ResourceNotFound(id.to_string()))?;

        Ok(CapacityGuard {
            resource,
            _permit: permit,
        })
    }

    /// Number of resources with a lock cell
    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    async fn lock_cell(&self, id: &ResourceId) -> Result<OwnedMutexGuard<()>> {
        let cell = {
            let entry = self
                .locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())));
            entry.value().clone()
            // Registry shard guard drops here, before any await
        };

        timeout(self.acquire_timeout, cell.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(
                    resource_id = %id,
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "Lock acquisition timed out"
                );
                Error::LockTimeout(format!(
                    "Resource {} still locked after {}ms",
                    id,
                    self.acquire_timeout.as_millis()
                ))
            })
    }
}

/// Exclusive handle over one resource's capacity row.
///
/// Holds the resource's lock for its whole lifetime. Adjustments accumulate
/// in the guard's working copy and reach storage only when the coordinator
/// commits them; dropping the guard releases the lock and discards anything
/// uncommitted. Drop runs on every exit path, including task cancellation.
#[derive(Debug)]
pub struct CapacityGuard {
    resource: Resource,
    _permit: OwnedMutexGuard<()>,
}

impl CapacityGuard {
    /// Counters as read under the lock
    pub fn snapshot(&self) -> CapacitySnapshot {
        self.resource.snapshot()
    }

    /// The full row as read under the lock
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Apply `available += delta` to the working copy.
    ///
    /// Negative for reservation, positive for cancellation. Fails with
    /// [`Error::InvariantViolation`] if the result would land outside
    /// `[0, total]`; the working copy is untouched on failure.
    pub fn adjust(&mut self, delta: i64) -> Result<()> {
        let current = i64::from(self.resource.available_seats);
        let total = i64::from(self.resource.total_seats);

        let next = current.checked_add(delta).ok_or_else(|| {
            Error::InvariantViolation(format!(
                "Capacity adjustment overflow: {} + {}",
                current, delta
            ))
        })?;

        if next < 0 || next > total {
            tracing::error!(
                resource_id = %self.resource.id,
                current,
                delta,
                total,
                "Capacity adjustment outside legal range"
            );
            return Err(Error::InvariantViolation(format!(
                "Adjustment by {} would move available to {}, outside [0, {}] for resource {}",
                delta, next, total, self.resource.id
            )));
        }

        self.resource.available_seats = next as u32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use tempfile::TempDir;

    fn test_store(acquire_timeout_ms: u64) -> (CapacityStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Arc::new(Storage::open(&config).unwrap());
        (
            CapacityStore::new(storage, Duration::from_millis(acquire_timeout_ms)),
            temp_dir,
        )
    }

    fn test_spec(id: &str, total: u32) -> ResourceSpec {
        ResourceSpec {
            id: ResourceId::new(id),
            name: format!("Run {}", id),
            origin: "Amsterdam".to_string(),
            destination: "Paris".to_string(),
            total_seats: total,
        }
    }

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let (store, _temp) = test_store(5_000);

        store.register(test_spec("IC-100", 50)).await.unwrap();

        let snapshot = store.snapshot(&ResourceId::new("IC-100")).unwrap();
        assert_eq!(snapshot.total, 50);
        assert_eq!(snapshot.available, 50);
        assert!(snapshot.active);
    }

    #[tokio::test]
    async fn test_register_duplicate_rejected() {
        let (store, _temp) = test_store(5_000);

        store.register(test_spec("IC-100", 50)).await.unwrap();

        let err = store.register(test_spec("IC-100", 80)).await.unwrap_err();
        assert!(matches!(err, Error::ResourceAlreadyExists(_)));

        // Original row untouched
        let snapshot = store.snapshot(&ResourceId::new("IC-100")).unwrap();
        assert_eq!(snapshot.total, 50);
    }

    #[tokio::test]
    async fn test_snapshot_unknown_resource() {
        let (store, _temp) = test_store(5_000);

        let err = store.snapshot(&ResourceId::new("IC-999")).unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_uncommitted_adjustment_is_discarded_on_drop() {
        let (store, _temp) = test_store(5_000);
        let id = ResourceId::new("IC-100");

        store.register(test_spec("IC-100", 50)).await.unwrap();

        let mut guard = store.acquire_exclusive(&id).await.unwrap();
        guard.adjust(-10).unwrap();
        assert_eq!(guard.resource().available_seats, 40);
        drop(guard);

        // Nothing was committed
        assert_eq!(store.snapshot(&id).unwrap().available, 50);
    }

    #[tokio::test]
    async fn test_adjust_rejects_departure_from_legal_range() {
        let (store, _temp) = test_store(5_000);
        let id = ResourceId::new("IC-100");

        store.register(test_spec("IC-100", 50)).await.unwrap();

        let mut guard = store.acquire_exclusive(&id).await.unwrap();

        let err = guard.adjust(-60).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(guard.resource().available_seats, 50);

        let err = guard.adjust(1).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert_eq!(guard.resource().available_seats, 50);
    }

    #[tokio::test]
    async fn test_second_acquirer_times_out() {
        let (store, _temp) = test_store(50);
        let id = ResourceId::new("IC-100");

        store.register(test_spec("IC-100", 50)).await.unwrap();

        let guard = store.acquire_exclusive(&id).await.unwrap();

        let err = store.acquire_exclusive(&id).await.unwrap_err();
        assert!(matches!(err, Error::LockTimeout(_)));
        assert!(err.is_retryable());

        drop(guard);
        store.acquire_exclusive(&id).await.unwrap();

        assert_eq!(store.tracked_locks(), 1);
    }

    #[tokio::test]
    async fn test_acquire_unknown_resource() {
        let (store, _temp) = test_store(5_000);

        let err = store
            .acquire_exclusive(&ResourceId::new("IC-999"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_active_toggles_flag() {
        let (store, _temp) = test_store(5_000);
        let id = ResourceId::new("IC-100");

        store.register(test_spec("IC-100", 50)).await.unwrap();

        store.set_active(&id, false).await.unwrap();
        assert!(!store.snapshot(&id).unwrap().active);

        store.set_active(&id, true).await.unwrap();
        assert!(store.snapshot(&id).unwrap().active);

        let err = store
            .set_active(&ResourceId::new("IC-999"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(_)));
    }
}
