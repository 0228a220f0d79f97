//! Crop cycle records, lifecycle state machine, and the cycle store abstraction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SchedulerError;
use crate::util::serde::{CycleId, ShelfRef};

/// Longest growing period a planting request may carry.
pub const MAX_GROWING_DAYS: u32 = 3650;

/// Growth stage of a crop cycle.
///
/// ```text
/// SEEDING -> INITIALIZED -> TRANSPLANT -> GROWING -> HARVESTED
///                       \-> QUEUED ----/
/// any non-terminal -> CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    /// Germinating off-shelf.
    Seeding,
    /// Ready for a shelf.
    Initialized,
    /// Bound to shelves, being transplanted.
    Transplant,
    /// Waiting in a shelf queue.
    Queued,
    /// Growing on its shelves.
    Growing,
    /// Harvested; terminal.
    Harvested,
    /// Cancelled; terminal.
    Cancelled,
}

impl CycleStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Harvested | Self::Cancelled)
    }

    /// Whether the state machine allows `self -> to`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, to) {
            (_, Self::Cancelled)
            | (Self::Seeding, Self::Initialized)
            | (Self::Initialized | Self::Queued, Self::Transplant)
            | (Self::Initialized, Self::Queued)
            | (Self::Transplant, Self::Growing)
            | (Self::Growing, Self::Harvested) => true,
            _ => false,
        }
    }

    /// Whether growth-stage progression outside the allocator may target this status.
    ///
    /// `QUEUED` and `TRANSPLANT` are entered only through allocation and promotion.
    #[must_use]
    pub const fn is_external_target(self) -> bool {
        !matches!(self, Self::Queued | Self::Transplant)
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seeding => "SEEDING",
            Self::Initialized => "INITIALIZED",
            Self::Transplant => "TRANSPLANT",
            Self::Queued => "QUEUED",
            Self::Growing => "GROWING",
            Self::Harvested => "HARVESTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A grower's planting request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSpec {
    /// Caller-chosen identifier; generated when absent.
    #[serde(default)]
    pub cycle_id: Option<CycleId>,
    /// Crop name, e.g. "Basil".
    pub crop_name: String,
    /// Variety, e.g. "Genovese".
    #[serde(default)]
    pub crop_variety: String,
    /// Crop type, e.g. "microgreens".
    #[serde(default)]
    pub crop_type: String,
    /// Number of shelves the cycle needs.
    pub requested_shelf_count: u32,
    /// Specific shelf the grower wants, if any.
    #[serde(default)]
    pub preferred_target: Option<ShelfRef>,
    /// Days on shelf from transplant to harvest.
    pub growing_days: u32,
    /// Start in `SEEDING` instead of `INITIALIZED`.
    #[serde(default)]
    pub start_in_seeding: bool,
}

impl CycleSpec {
    /// Minimal spec for `crop_name` needing `requested_shelf_count` shelves.
    pub fn new(crop_name: impl Into<String>, requested_shelf_count: u32, growing_days: u32) -> Self {
        Self {
            cycle_id: None,
            crop_name: crop_name.into(),
            crop_variety: String::new(),
            crop_type: String::new(),
            requested_shelf_count,
            preferred_target: None,
            growing_days,
            start_in_seeding: false,
        }
    }

    /// Set an explicit identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<CycleId>) -> Self {
        self.cycle_id = Some(id.into());
        self
    }

    /// Set variety and type.
    #[must_use]
    pub fn with_variety(mut self, variety: impl Into<String>, crop_type: impl Into<String>) -> Self {
        self.crop_variety = variety.into();
        self.crop_type = crop_type.into();
        self
    }

    /// Ask for one exact shelf.
    #[must_use]
    pub fn with_preferred_target(mut self, shelf: ShelfRef) -> Self {
        self.preferred_target = Some(shelf);
        self
    }

    /// Start the cycle in `SEEDING`.
    #[must_use]
    pub fn seeding(mut self) -> Self {
        self.start_in_seeding = true;
        self
    }
}

/// One planting-to-harvest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropCycle {
    /// Identifier.
    pub cycle_id: CycleId,
    /// Crop name.
    pub crop_name: String,
    /// Variety.
    pub crop_variety: String,
    /// Crop type.
    pub crop_type: String,
    /// Lifecycle stage.
    pub status: CycleStatus,
    /// Bound shelves; empty while queued.
    pub shelves: Vec<ShelfRef>,
    /// Shelves requested at planting.
    pub requested_shelf_count: u32,
    /// Shelf the cycle is waiting for, if any.
    pub preferred_target: Option<ShelfRef>,
    /// Days on shelf from transplant to harvest.
    pub growing_days: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status or binding change.
    pub updated_at: DateTime<Utc>,
}

impl CropCycle {
    /// Build a fresh cycle from a planting request.
    pub fn from_spec(spec: CycleSpec, now: DateTime<Utc>) -> Result<Self, SchedulerError> {
        if spec.requested_shelf_count == 0 {
            return Err(SchedulerError::InvalidRequestedCount(0));
        }
        if spec.growing_days > MAX_GROWING_DAYS {
            return Err(SchedulerError::InvalidGrowingDays(spec.growing_days));
        }
        let status = if spec.start_in_seeding {
            CycleStatus::Seeding
        } else {
            CycleStatus::Initialized
        };
        Ok(Self {
            cycle_id: spec.cycle_id.unwrap_or_else(CycleId::generate),
            crop_name: spec.crop_name,
            crop_variety: spec.crop_variety,
            crop_type: spec.crop_type,
            status,
            shelves: Vec::new(),
            requested_shelf_count: spec.requested_shelf_count,
            preferred_target: spec.preferred_target,
            growing_days: spec.growing_days,
            created_at: now,
            updated_at: now,
        })
    }

    /// Estimated release time if bound at `now`.
    ///
    /// Fails when the period runs past the representable calendar, which
    /// can only happen for records that skipped [`CropCycle::from_spec`].
    pub fn release_estimate(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, SchedulerError> {
        chrono::Duration::try_days(i64::from(self.growing_days))
            .and_then(|period| now.checked_add_signed(period))
            .ok_or(SchedulerError::InvalidGrowingDays(self.growing_days))
    }
}

/// Store of crop cycles in one farm.
///
/// Backends implement the three primitives; lifecycle rules live in the
/// provided methods so every backend enforces the same state machine.
pub trait CycleStore {
    /// Insert a new cycle; fails with `DuplicateCycle` if the id exists.
    fn insert(&mut self, cycle: CropCycle) -> Result<(), SchedulerError>;

    /// Fetch a cycle.
    fn get(&self, id: &CycleId) -> Result<CropCycle, SchedulerError>;

    /// Replace an existing cycle record.
    fn update(&mut self, cycle: CropCycle) -> Result<(), SchedulerError>;

    /// All cycles in creation order.
    fn list(&self) -> Vec<CropCycle>;

    /// Delete a cycle record, returning it.
    fn remove(&mut self, id: &CycleId) -> Result<CropCycle, SchedulerError>;

    /// Create a cycle in `INITIALIZED` (or `SEEDING`) with no shelves.
    fn create(&mut self, spec: CycleSpec, now: DateTime<Utc>) -> Result<CropCycle, SchedulerError> {
        let cycle = CropCycle::from_spec(spec, now)?;
        self.insert(cycle.clone())?;
        Ok(cycle)
    }

    /// Move a cycle to `to`, enforcing the state machine.
    fn advance(
        &mut self,
        id: &CycleId,
        to: CycleStatus,
        now: DateTime<Utc>,
    ) -> Result<CropCycle, SchedulerError> {
        let mut cycle = self.get(id)?;
        if !cycle.status.can_transition_to(to) {
            tracing::error!(cycle_id = %id, from = %cycle.status, to = %to, "rejected lifecycle transition");
            return Err(SchedulerError::InvalidTransition {
                cycle: id.clone(),
                from: cycle.status,
                to,
            });
        }
        cycle.status = to;
        cycle.updated_at = now;
        self.update(cycle.clone())?;
        Ok(cycle)
    }

    /// Record the shelves a cycle is bound to and clear its preferred target.
    fn bind_shelves(
        &mut self,
        id: &CycleId,
        shelves: Vec<ShelfRef>,
        now: DateTime<Utc>,
    ) -> Result<CropCycle, SchedulerError> {
        let mut cycle = self.get(id)?;
        if !matches!(cycle.status, CycleStatus::Initialized | CycleStatus::Queued) {
            tracing::error!(cycle_id = %id, status = %cycle.status, "bind attempted outside INITIALIZED/QUEUED");
            return Err(SchedulerError::InvalidTransition {
                cycle: id.clone(),
                from: cycle.status,
                to: CycleStatus::Transplant,
            });
        }
        cycle.shelves = shelves;
        cycle.preferred_target = None;
        cycle.updated_at = now;
        self.update(cycle.clone())?;
        Ok(cycle)
    }

    /// Drop `shelf` from a cycle's binding. Returns whether it was bound.
    fn detach_shelf(
        &mut self,
        id: &CycleId,
        shelf: &ShelfRef,
        now: DateTime<Utc>,
    ) -> Result<bool, SchedulerError> {
        let mut cycle = self.get(id)?;
        let before = cycle.shelves.len();
        cycle.shelves.retain(|s| s != shelf);
        if cycle.shelves.len() == before {
            return Ok(false);
        }
        cycle.updated_at = now;
        self.update(cycle)?;
        Ok(true)
    }

    /// Cycles that are neither harvested nor cancelled.
    fn active(&self) -> Vec<CropCycle> {
        self.list()
            .into_iter()
            .filter(|c| !c.status.is_terminal())
            .collect()
    }
}
