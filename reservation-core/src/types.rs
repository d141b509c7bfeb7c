//! Core types for the reservation core
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Plain foreign-key identifiers instead of object-graph edges
//! - Unsigned counters (a negative seat count is unrepresentable)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Resource identifier (a scheduled run, assigned by the catalog)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create new resource ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requester identifier (resolved by the identity collaborator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(String);

impl RequesterId {
    /// Create new requester ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bookable capacity-bearing entity (one scheduled train run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource ID
    pub id: ResourceId,

    /// Human-readable name
    pub name: String,

    /// Origin station
    pub origin: String,

    /// Destination station
    pub destination: String,

    /// Fixed total capacity
    pub total_seats: u32,

    /// Currently available capacity (0 <= available <= total)
    pub available_seats: u32,

    /// Accepts reservations only while true
    pub active: bool,
}

impl Resource {
    /// Point-in-time view of the capacity counters
    pub fn snapshot(&self) -> CapacitySnapshot {
        CapacitySnapshot {
            total: self.total_seats,
            available: self.available_seats,
            active: self.active,
        }
    }
}

/// Parameters for registering a new resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Unique resource ID
    pub id: ResourceId,

    /// Human-readable name
    pub name: String,

    /// Origin station
    pub origin: String,

    /// Destination station
    pub destination: String,

    /// Fixed total capacity
    pub total_seats: u32,
}

impl ResourceSpec {
    /// Build the initial capacity row: fully available and active
    pub fn into_resource(self) -> Resource {
        Resource {
            id: self.id,
            name: self.name,
            origin: self.origin,
            destination: self.destination,
            total_seats: self.total_seats,
            available_seats: self.total_seats,
            active: true,
        }
    }
}

/// Point-in-time view of a resource's capacity counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Fixed total capacity
    pub total: u32,

    /// Currently available capacity
    pub available: u32,

    /// Whether the resource accepts new reservations
    pub active: bool,
}

/// A committed claim on some quantity of a resource's capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Resource the claim is held against
    pub resource_id: ResourceId,

    /// Requester that owns the claim
    pub requester_id: RequesterId,

    /// Number of seats claimed
    pub quantity: u32,

    /// Current status
    pub status: ReservationStatus,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the claim currently holds capacity
    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }
}

/// Reservation status
///
/// Records are only ever persisted in one of these two states; a reservation
/// that fails validation or commit leaves no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReservationStatus {
    /// Committed and holding capacity
    Confirmed = 1,
    /// Released; its quantity has been returned to the resource
    Cancelled = 2,
}
