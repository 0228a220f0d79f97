//! Shelf selection for direct allocation.
//!
//! Selection is a pure read of the registry; the farm applies the result
//! under its lock, so a plan is never observed half-applied.

use serde::{Deserialize, Serialize};

use crate::core::{SchedulerError, ShelfRegistry};
use crate::util::serde::ShelfRef;

/// Outcome of an allocation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AllocationResult {
    /// Every requested shelf was bound.
    Bound {
        /// Shelves in allocation order.
        shelves: Vec<ShelfRef>,
    },
    /// Not enough free shelves; nothing was bound.
    Unsatisfied {
        /// Shelves missing to satisfy the request.
        shortfall: u32,
    },
}

impl AllocationResult {
    /// Whether the request was satisfied.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        matches!(self, Self::Bound { .. })
    }
}

/// Choose shelves for a request of `requested` shelves.
///
/// With a `preferred` shelf only that shelf is a candidate. Otherwise free
/// shelves are taken in ascending `(rack_id, shelf_id)` order. A free shelf
/// for which `reserved` returns true is held for its queue and never picked.
/// Selection is all-or-nothing: fewer candidates than requested yields
/// `Unsatisfied`.
pub fn plan_allocation<R: ShelfRegistry + ?Sized>(
    registry: &R,
    requested: u32,
    preferred: Option<&ShelfRef>,
    reserved: impl Fn(&ShelfRef) -> bool,
) -> Result<AllocationResult, SchedulerError> {
    if requested == 0 {
        tracing::error!("allocation requested zero shelves");
        return Err(SchedulerError::InvalidRequestedCount(requested));
    }

    let candidates: Vec<ShelfRef> = match preferred {
        Some(shelf) => {
            let record = registry.get(shelf)?;
            if record.is_free() && !reserved(&record.location) {
                vec![record.location]
            } else {
                Vec::new()
            }
        }
        None => registry
            .free_shelves()
            .into_iter()
            .map(|s| s.location)
            .filter(|s| !reserved(s))
            .take(requested as usize)
            .collect(),
    };

    let found = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
    if found < requested {
        return Ok(AllocationResult::Unsatisfied {
            shortfall: requested - found,
        });
    }
    Ok(AllocationResult::Bound { shelves: candidates })
}
