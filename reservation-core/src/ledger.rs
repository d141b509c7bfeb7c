//! Booking ledger: the record of committed reservations
//!
//! Appends happen inside the coordinator's atomic commit (the capacity row
//! and the reservation record share one write batch), so this module is the
//! read side: point lookups and per-requester listings.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{RequesterId, Reservation, ReservationStatus},
};
use std::sync::Arc;
use uuid::Uuid;

/// Query interface over committed reservations
pub struct BookingLedger {
    storage: Arc<Storage>,
}

impl BookingLedger {
    /// Create a ledger over the shared storage handle
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Fetch one reservation by ID
    pub fn get(&self, id: Uuid) -> Result<Reservation> {
        self.storage
            .get_reservation(id)?
            .ok_or_else(|| Error::ReservationNotFound(id.to_string()))
    }

    /// Lazily iterate one requester's reservations in creation order.
    ///
    /// `status = None` yields every record; `Some(s)` keeps only records
    /// currently in that status. The sequence is finite and restartable:
    /// call again for a fresh pass over current data. A requester with no
    /// reservations yields an empty sequence.
    pub fn list_by_requester(
        &self,
        requester: &RequesterId,
        status: Option<ReservationStatus>,
    ) -> Result<impl Iterator<Item = Result<Reservation>> + '_> {
        let iter = self.storage.reservations_by_requester(requester)?;

        Ok(iter.filter(move |item| match (status, item) {
            (None, _) => true,
            // Read errors surface regardless of the filter
            (_, Err(_)) => true,
            (Some(wanted), Ok(reservation)) => reservation.status == wanted,
        }))
    }
}
