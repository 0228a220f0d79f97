//! Read models computed from registry, cycle, and queue state on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::farm::{Farm, FarmState};
use crate::core::{CropCycle, CycleStatus, CycleStore, QueueEntry, QueueStore, ShelfRegistry};
use crate::util::clock::days_until;
use crate::util::serde::CycleId;

/// Shown when the occupant of a shelf cannot be resolved.
pub const UNKNOWN_CROP: &str = "Unknown";

/// The shelf a pending cycle is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingForShelf {
    /// Rack identifier.
    pub rack_id: String,
    /// Shelf identifier.
    pub shelf_id: String,
    /// Crop currently on the shelf.
    pub current_crop: String,
    /// Whole days until the occupant is expected to leave; `0` means now.
    pub days_until_available: i64,
    /// Expected release time of the occupant.
    pub expected_available_date: Option<DateTime<Utc>>,
}

/// One queued cycle as the pending-cycle view shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCycleView {
    /// Cycle identifier.
    pub cycle_id: CycleId,
    /// Crop name.
    pub crop_name: String,
    /// Variety.
    pub crop_variety: String,
    /// Crop type.
    pub crop_type: String,
    /// 1-based rank among cycles waiting for the same shelf.
    pub queue_position: usize,
    /// Shelf being waited for.
    pub waiting_for_shelf: WaitingForShelf,
    /// Stage the cycle resumes at once granted.
    pub will_start_from: CycleStatus,
    /// Arrival time in the queue.
    pub queued_at: DateTime<Utc>,
}

/// Current allocation of a farm for the rack/shelf allocator view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSnapshot {
    /// Provisioned shelves.
    pub total_shelves: usize,
    /// Shelves currently bound.
    pub occupied_shelves: usize,
    /// Cycles neither harvested nor cancelled, with their shelves.
    #[serde(rename = "cropcycles")]
    pub crop_cycles: Vec<CropCycle>,
}

/// Queue entries of a farm, grouped by shelf, head first.
pub fn pending_cycles<R, C, Q>(state: &FarmState<R, C, Q>, now: DateTime<Utc>) -> Vec<PendingCycleView>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    let mut views = Vec::with_capacity(state.queue.len());
    let mut position = 0;
    let mut last_shelf = None;
    for entry in state.queue.all() {
        let Ok(cycle) = state.cycles.get(&entry.cycle_id) else {
            tracing::warn!(cycle_id = %entry.cycle_id, "queue entry for unknown cycle");
            continue;
        };
        if last_shelf.as_ref() == Some(&entry.target_shelf) {
            position += 1;
        } else {
            position = 1;
            last_shelf = Some(entry.target_shelf.clone());
        }
        views.push(PendingCycleView {
            waiting_for_shelf: waiting_for(state, &entry, now),
            cycle_id: cycle.cycle_id,
            crop_name: cycle.crop_name,
            crop_variety: cycle.crop_variety,
            crop_type: cycle.crop_type,
            queue_position: position,
            will_start_from: entry.will_start_from,
            queued_at: entry.queued_at,
        });
    }
    views
}

fn waiting_for<R, C, Q>(state: &FarmState<R, C, Q>, entry: &QueueEntry, now: DateTime<Utc>) -> WaitingForShelf
where
    R: ShelfRegistry,
    C: CycleStore,
{
    let shelf = state.registry.get(&entry.target_shelf).ok();
    let occupant = shelf.as_ref().and_then(|s| s.occupant_cycle_id.as_ref());
    let current_crop = occupant
        .and_then(|id| state.cycles.get(id).ok())
        .map_or_else(|| UNKNOWN_CROP.to_owned(), |c| c.crop_name);
    let expected_available_date = shelf.as_ref().and_then(|s| s.occupied_until);
    WaitingForShelf {
        rack_id: entry.target_shelf.rack_id.clone(),
        shelf_id: entry.target_shelf.shelf_id.clone(),
        current_crop,
        days_until_available: expected_available_date.map_or(0, |until| days_until(until, now)),
        expected_available_date,
    }
}

/// Shelf totals and active cycles of a farm.
pub fn allocation_snapshot<R, C, Q>(state: &FarmState<R, C, Q>) -> AllocationSnapshot
where
    R: ShelfRegistry,
    C: CycleStore,
{
    let shelves = state.registry.list();
    AllocationSnapshot {
        total_shelves: shelves.len(),
        occupied_shelves: shelves.iter().filter(|s| !s.is_free()).count(),
        crop_cycles: state.cycles.active(),
    }
}

impl<R, C, Q> Farm<R, C, Q>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    /// Pending-cycle view of this farm at `now`.
    pub fn pending_view(&self, now: DateTime<Utc>) -> Vec<PendingCycleView> {
        self.read(|state| pending_cycles(state, now))
    }

    /// Allocation snapshot of this farm.
    pub fn allocation_view(&self) -> AllocationSnapshot {
        self.read(allocation_snapshot)
    }
}
