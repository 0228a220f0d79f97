//! Shelf records and the resource registry abstraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{CycleId, ShelfRef};

/// Occupancy state of a shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShelfStatus {
    /// No cycle holds the shelf.
    Free,
    /// A cycle is bound to the shelf.
    Occupied,
}

/// Smallest allocatable growing slot.
///
/// `status == Occupied` exactly when `occupant_cycle_id` is set; only the
/// registry methods below change either field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelf {
    /// Physical address.
    #[serde(flatten)]
    pub location: ShelfRef,
    /// Occupancy state.
    pub status: ShelfStatus,
    /// Cycle bound to this shelf, if any.
    pub occupant_cycle_id: Option<CycleId>,
    /// Estimated release time of the current occupant.
    pub occupied_until: Option<DateTime<Utc>>,
}

impl Shelf {
    /// A newly provisioned, free shelf.
    #[must_use]
    pub const fn free(location: ShelfRef) -> Self {
        Self {
            location,
            status: ShelfStatus::Free,
            occupant_cycle_id: None,
            occupied_until: None,
        }
    }

    /// Whether the shelf can be bound.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.status == ShelfStatus::Free
    }

    /// Whether `cycle` currently holds this shelf.
    #[must_use]
    pub fn is_held_by(&self, cycle: &CycleId) -> bool {
        self.occupant_cycle_id.as_ref() == Some(cycle)
    }
}

/// Store of every shelf in one farm and its occupancy.
///
/// Implementations are not internally synchronized; the owning farm
/// serializes all calls under its lock.
pub trait ShelfRegistry {
    /// Look up one shelf.
    fn get(&self, shelf: &ShelfRef) -> Result<Shelf, SchedulerError>;

    /// Bind `cycle` to `shelf` until `until`.
    ///
    /// Re-binding by the current occupant refreshes `occupied_until`; any
    /// other occupant yields `AlreadyOccupied`.
    fn mark_occupied(
        &mut self,
        shelf: &ShelfRef,
        cycle: &CycleId,
        until: DateTime<Utc>,
    ) -> Result<(), SchedulerError>;

    /// Clear occupancy and return the shelf as it was before release.
    ///
    /// Fails with `NotOccupied` if the shelf is already free.
    fn mark_free(&mut self, shelf: &ShelfRef) -> Result<Shelf, SchedulerError>;

    /// All shelves ordered by rack, then shelf.
    fn list(&self) -> Vec<Shelf>;

    /// Number of provisioned shelves.
    fn len(&self) -> usize;

    /// Whether no shelves are provisioned.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free shelves in allocation order.
    fn free_shelves(&self) -> Vec<Shelf> {
        self.list().into_iter().filter(Shelf::is_free).collect()
    }
}
