//! Error types for allocator and queue operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::cycle::CycleStatus;
use crate::util::serde::{CycleId, FarmId, ShelfRef};

/// Errors produced by scheduler components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// No farm is provisioned under this identifier.
    #[error("farm not found: {0}")]
    FarmNotFound(FarmId),
    /// Shelf address does not exist in the farm.
    #[error("shelf not found: {0}")]
    ShelfNotFound(ShelfRef),
    /// Cycle does not exist in the store.
    #[error("cycle not found: {0}")]
    CycleNotFound(CycleId),
    /// A cycle with this identifier already exists.
    #[error("cycle already exists: {0}")]
    DuplicateCycle(CycleId),
    /// Shelf is held by a different cycle.
    #[error("shelf {shelf} already occupied by {occupant}")]
    AlreadyOccupied {
        /// Contended shelf.
        shelf: ShelfRef,
        /// Current occupant.
        occupant: CycleId,
    },
    /// Shelf was expected to be occupied but is free.
    #[error("shelf not occupied: {0}")]
    NotOccupied(ShelfRef),
    /// Cycle already has a queue entry.
    #[error("cycle {cycle} already queued for {shelf}")]
    AlreadyQueued {
        /// Queued cycle.
        cycle: CycleId,
        /// Shelf it is waiting for.
        shelf: ShelfRef,
    },
    /// No queue entry exists for the cycle.
    #[error("queue entry not found for cycle {0}")]
    EntryNotFound(CycleId),
    /// The shelf's wait queue reached its configured depth.
    #[error("queue full for shelf {0}")]
    QueueFull(ShelfRef),
    /// Lifecycle transition not permitted by the state machine.
    #[error("invalid transition for cycle {cycle}: {from} -> {to}")]
    InvalidTransition {
        /// Cycle being advanced.
        cycle: CycleId,
        /// Current status.
        from: CycleStatus,
        /// Requested status.
        to: CycleStatus,
    },
    /// Requested shelf count must be at least one.
    #[error("invalid requested shelf count: {0}")]
    InvalidRequestedCount(u32),
    /// Growing period too long to schedule.
    #[error("growing days out of range: {0}")]
    InvalidGrowingDays(u32),
    /// Farm layout or configuration rejected.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Expected under concurrency; callers retry or fall back to enqueue.
    Contention,
    /// Missing farm, shelf, cycle, or entry.
    NotFound,
    /// Programming or integration error; rejected and logged loudly.
    InvariantViolation,
    /// Storage or infrastructure failure.
    Backend,
}

impl SchedulerError {
    /// Classify this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyOccupied { .. } | Self::AlreadyQueued { .. } | Self::QueueFull(_) => {
                ErrorClass::Contention
            }
            Self::FarmNotFound(_)
            | Self::ShelfNotFound(_)
            | Self::CycleNotFound(_)
            | Self::EntryNotFound(_)
            | Self::NotOccupied(_) => ErrorClass::NotFound,
            Self::DuplicateCycle(_)
            | Self::InvalidTransition { .. }
            | Self::InvalidRequestedCount(_)
            | Self::InvalidGrowingDays(_)
            | Self::InvalidLayout(_) => ErrorClass::InvariantViolation,
            Self::Backend(_) => ErrorClass::Backend,
        }
    }

    /// Whether the UI should offer a retry rather than a blocking error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Contention | ErrorClass::Backend)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
