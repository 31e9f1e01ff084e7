//! Error types for ring operations.
//!
//! Variants are grouped by how callers are expected to react: validation,
//! capacity, and authorization failures are terminal for that attempt;
//! `Conflict` requires a fresh read and a retry of the whole operation;
//! consistency errors indicate a protocol violation and are logged where
//! they are raised, never swallowed.

use crate::rings::types::RingStatus;
use uuid::Uuid;

/// Root error type for all ring engine operations.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Ring {ring_id} not found")]
    NotFound { ring_id: Uuid },

    #[error("Ring {ring_id} is full ({max_participants} participants)")]
    RingFull {
        ring_id: Uuid,
        max_participants: u32,
    },

    #[error("Ring {ring_id} is closed for admission (status: {status})")]
    RingClosed { ring_id: Uuid, status: RingStatus },

    #[error("Identity {identity} already joined ring {ring_id}")]
    AlreadyJoined { ring_id: Uuid, identity: String },

    #[error("Payment rejected: {reason}")]
    PaymentRejected { reason: String },

    #[error("Version conflict on ring {ring_id}: expected {expected_version}, found {actual_version}")]
    Conflict {
        ring_id: Uuid,
        expected_version: u64,
        actual_version: u64,
    },

    #[error("Identity {requester} is not authorized to spin ring {ring_id}")]
    Unauthorized { ring_id: Uuid, requester: String },

    #[error("Ring {ring_id} has {current} participant(s), at least 2 required")]
    InsufficientParticipants { ring_id: Uuid, current: u32 },

    #[error("Ring {ring_id} is in state {actual}, expected {expected}")]
    InvalidState {
        ring_id: Uuid,
        expected: RingStatus,
        actual: RingStatus,
    },

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Protocol violations. These must surface to operators, never be retried.
#[derive(Debug, thiserror::Error)]
pub enum ConsistencyError {
    #[error("Finalize invoked on ring {ring_id} in state {status}, expected spinning")]
    FinalizeOutOfOrder { ring_id: Uuid, status: RingStatus },

    #[error("Winner {winner} is not a participant of ring {ring_id}")]
    WinnerNotParticipant { ring_id: Uuid, winner: String },
}

impl RingError {
    /// Whether the caller may re-read state and retry the entire operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RingError::Conflict { .. })
    }
}

/// Convenience type alias for Results
pub type RingResult<T> = Result<T, RingError>;
