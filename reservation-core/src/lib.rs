//! RailRes Reservation Core
//!
//! Seat reservation arbitration over RocksDB: many concurrent requesters
//! compete for a finite pool of seats per scheduled run, without oversell.
//!
//! # Architecture
//!
//! - **Capacity Store**: one durable capacity row per resource, guarded by a
//!   per-resource exclusive lock with bounded acquisition
//! - **Transaction Coordinator**: validate, lock, decrement, record, commit
//!   as one atomic unit
//! - **Booking Ledger**: append-only reservation records, indexed by
//!   requester
//!
//! # Invariants
//!
//! - Capacity conservation: available == total − Σ(confirmed quantities)
//! - No oversell: bookings against one resource serialize on its lock
//! - All-or-nothing: the capacity row and the reservation record commit in
//!   a single write batch, or not at all
//! - Bounded waiting: lock acquisition fails with `LockTimeout` after the
//!   configured bound instead of queueing forever

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod types;
pub mod storage;
pub mod capacity;
pub mod coordinator;
pub mod ledger;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{
    CapacitySnapshot, RequesterId, Reservation, ReservationStatus, Resource, ResourceId,
    ResourceSpec,
};
pub use capacity::{CapacityGuard, CapacityStore};
pub use coordinator::Coordinator;
pub use ledger::BookingLedger;
pub use storage::{Storage, StorageStats};
pub use config::Config;
