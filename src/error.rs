use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the trip coordination layer.
#[derive(Error, Debug)]
pub enum TripError {
    /// Database error from the Postgres-backed store.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Trip id does not exist in the store.
    #[error("trip not found: {0}")]
    TripNotFound(Uuid),

    /// A completed trip is immutable; no further writes are accepted.
    #[error("trip {0} is already completed")]
    TripCompleted(Uuid),

    /// Safe-check interval must be a positive duration.
    #[error("safe-check interval must be greater than zero")]
    InvalidInterval,

    /// Sharing a trip requires at least one trusted contact.
    #[error("no trusted contacts configured")]
    NoContacts,

    /// Persisted status column holds a value outside the state machine.
    #[error("unknown trip status: {0}")]
    UnknownStatus(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TripError>;
