//! Error types for the reservation core

use thiserror::Error;

/// Result type for reservation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reservation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Requested quantity was zero
    #[error("Invalid quantity: must be at least 1")]
    InvalidQuantity,

    /// Resource not found
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Resource exists but is withdrawn from sale
    #[error("Resource inactive: {0}")]
    ResourceInactive(String),

    /// Requested quantity exceeds current availability
    #[error("Insufficient capacity: requested {requested}, available {available}")]
    InsufficientCapacity {
        /// Seats the caller asked for
        requested: u32,
        /// Seats available at check time
        available: u32,
    },

    /// Exclusive access to the resource was not granted within the bound
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Reservation not found
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    /// Reservation was already cancelled
    #[error("Already cancelled: {0}")]
    AlreadyCancelled(String),

    /// Resource ID already registered
    #[error("Resource already exists: {0}")]
    ResourceAlreadyExists(String),

    /// Storage failed mid-transaction; no partial effects persist
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Capacity accounting left the legal range (operator attention required)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the same call may be retried as-is.
    ///
    /// Only a lock timeout is transient: nothing was mutated and a later
    /// attempt may win the lock. Every other error is terminal for the
    /// given input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::LockTimeout(_))
    }

    /// Stable lowercase label for the error variant, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidQuantity => "invalid_quantity",
            Error::ResourceNotFound(_) => "resource_not_found",
            Error::ResourceInactive(_) => "resource_inactive",
            Error::InsufficientCapacity { .. } => "insufficient_capacity",
            Error::LockTimeout(_) => "lock_timeout",
            Error::ReservationNotFound(_) => "reservation_not_found",
            Error::AlreadyCancelled(_) => "already_cancelled",
            Error::ResourceAlreadyExists(_) => "resource_already_exists",
            Error::PersistenceFailure(_) => "persistence_failure",
            Error::InvariantViolation(_) => "invariant_violation",
            Error::Serialization(_) => "serialization",
            Error::Metrics(_) => "metrics",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::PersistenceFailure(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
