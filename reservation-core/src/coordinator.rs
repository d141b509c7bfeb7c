//! Reservation transaction coordination
//!
//! This module ties together the capacity store, the booking ledger, and
//! metrics into a high-level API for seat booking.
//!
//! One booking is one atomic unit: validate, lock, decrement, record,
//! commit. The resource's exclusive lock is held from validation through
//! commit, so two bookings against the same resource can never interleave
//! between the availability check and the capacity write. The commit itself
//! is a single synchronous write batch; there is no await point between
//! staging and durability, so an abandoned call can never leave a
//! half-written transaction.
//!
//! # Example
//!
//! ```no_run
//! use reservation_core::{Config, Coordinator, RequesterId, ResourceId, ResourceSpec};
//!
//! #[tokio::main]
//! async fn main() -> reservation_core::Result<()> {
//!     let coordinator = Coordinator::open(Config::default())?;
//!
//!     coordinator
//!         .register_resource(ResourceSpec {
//!             id: ResourceId::new("IC-4021"),
//!             name: "Intercity 4021".to_string(),
//!             origin: "Amsterdam".to_string(),
//!             destination: "Paris".to_string(),
//!             total_seats: 420,
//!         })
//!         .await?;
//!
//!     let reservation_id = coordinator
//!         .reserve(ResourceId::new("IC-4021"), RequesterId::new("user-91"), 2)
//!         .await?;
//!     println!("confirmed {}", reservation_id);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    capacity::CapacityStore,
    error::{Error, Result},
    ledger::BookingLedger,
    metrics::Metrics,
    storage::{Storage, StorageStats},
    types::{
        CapacitySnapshot, RequesterId, Reservation, ReservationStatus, ResourceId, ResourceSpec,
    },
    Config,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use uuid::Uuid;

/// Reservation transaction coordinator
pub struct Coordinator {
    /// Capacity rows and their per-resource locks
    capacity: CapacityStore,

    /// Committed reservation records (read side)
    ledger: BookingLedger,

    /// Direct storage access (for atomic commits)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,
}

impl Coordinator {
    /// Open coordinator with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        let capacity = CapacityStore::new(
            storage.clone(),
            Duration::from_millis(config.locking.acquire_timeout_ms),
        );
        let ledger = BookingLedger::new(storage.clone());
        let metrics = Metrics::new()?;

        // Seed the resource gauge from what is already on disk
        let stats = storage.stats()?;
        metrics.set_resources(stats.total_resources as i64);

        tracing::info!(
            resources = stats.total_resources,
            reservations = stats.total_reservations,
            lock_timeout_ms = config.locking.acquire_timeout_ms,
            "Reservation coordinator opened"
        );

        Ok(Self {
            capacity,
            ledger,
            storage,
            metrics,
        })
    }

    /// Reserve `quantity` seats on a resource for a requester.
    ///
    /// Returns the new reservation's ID. On any error the capacity counter
    /// and the ledger are exactly as if the call never happened; only
    /// [`Error::LockTimeout`] is worth retrying.
    pub async fn reserve(
        &self,
        resource_id: ResourceId,
        requester_id: RequesterId,
        quantity: u32,
    ) -> Result<Uuid> {
        let started = Instant::now();
        let result = self
            .reserve_inner(resource_id, requester_id, quantity)
            .await;
        self.metrics
            .observe_reserve(started.elapsed().as_secs_f64(), &result);
        result
    }

    async fn reserve_inner(
        &self,
        resource_id: ResourceId,
        requester_id: RequesterId,
        quantity: u32,
    ) -> Result<Uuid> {
        // 1. Validate before touching any lock
        if quantity == 0 {
            return Err(Error::InvalidQuantity);
        }

        // 2. Exclusive access to this resource's capacity row
        let lock_started = Instant::now();
        let mut guard = self.capacity.acquire_exclusive(&resource_id).await?;
        self.metrics
            .observe_lock_wait(lock_started.elapsed().as_secs_f64());

        // 3. Authoritative checks under the lock
        let snapshot = guard.snapshot();
        if !snapshot.active {
            return Err(Error::ResourceInactive(resource_id.to_string()));
        }
        if quantity > snapshot.available {
            return Err(Error::InsufficientCapacity {
                requested: quantity,
                available: snapshot.available,
            });
        }

        // 4. Stage the decrement in the guard's working copy
        guard.adjust(-i64::from(quantity))?;

        // 5. Record + commit in one write batch
        let reservation = Reservation {
            id: Uuid::now_v7(),
            resource_id,
            requester_id,
            quantity,
            status: ReservationStatus::Confirmed,
            created_at: Utc::now(),
        };
        self.storage
            .commit_reservation(guard.resource(), &reservation)?;

        tracing::info!(
            reservation_id = %reservation.id,
            resource_id = %reservation.resource_id,
            requester_id = %reservation.requester_id,
            quantity,
            available = guard.resource().available_seats,
            "Reservation confirmed"
        );

        Ok(reservation.id)
        // Guard drops here: the lock is released on every path out
    }

    /// Cancel a confirmed reservation and return its seats to the resource.
    ///
    /// Follows the same protocol as [`Coordinator::reserve`]: the resource's
    /// exclusive lock is held across the status check, the capacity
    /// restoration, and the commit. Cancellation works on inactive resources
    /// too; deactivation stops new sales, not refunds.
    pub async fn cancel(&self, reservation_id: Uuid) -> Result<()> {
        // Locate the resource; the authoritative status check happens under
        // the lock
        let resource_id = self.ledger.get(reservation_id)?.resource_id;

        let mut guard = self.capacity.acquire_exclusive(&resource_id).await?;

        // Re-read under the lock: a concurrent cancel may have won the race
        let mut reservation = self.ledger.get(reservation_id)?;
        if reservation.status != ReservationStatus::Confirmed {
            return Err(Error::AlreadyCancelled(reservation_id.to_string()));
        }

        guard.adjust(i64::from(reservation.quantity))?;
        reservation.status = ReservationStatus::Cancelled;

        self.storage
            .commit_reservation(guard.resource(), &reservation)?;
        self.metrics.record_cancelled();

        tracing::info!(
            reservation_id = %reservation.id,
            resource_id = %reservation.resource_id,
            quantity = reservation.quantity,
            available = guard.resource().available_seats,
            "Reservation cancelled"
        );

        Ok(())
    }

    /// Register a new bookable resource
    pub async fn register_resource(&self, spec: ResourceSpec) -> Result<()> {
        self.capacity.register(spec).await?;
        self.metrics.record_resource_registered();
        Ok(())
    }

    /// Activate or deactivate a resource.
    ///
    /// Deactivation rejects new reservations but leaves existing ones
    /// untouched; they remain cancellable.
    pub async fn set_resource_active(&self, id: &ResourceId, active: bool) -> Result<()> {
        self.capacity.set_active(id, active).await
    }

    /// Read-only view of a resource's capacity counters
    pub fn capacity_snapshot(&self, id: &ResourceId) -> Result<CapacitySnapshot> {
        self.capacity.snapshot(id)
    }

    /// Fetch one reservation by ID
    pub fn reservation(&self, id: Uuid) -> Result<Reservation> {
        self.ledger.get(id)
    }

    /// List one requester's reservations in creation order, optionally
    /// filtered by status
    pub fn list_reservations(
        &self,
        requester: &RequesterId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>> {
        self.ledger.list_by_requester(requester, status)?.collect()
    }

    /// The capacity store, for collaborators that manage exclusive access
    /// directly
    pub fn capacity(&self) -> &CapacityStore {
        &self.capacity
    }

    /// The booking ledger, for collaborators that stream listings lazily
    pub fn ledger(&self) -> &BookingLedger {
        &self.ledger
    }

    /// Metrics collector (scrape via its registry)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }
}
