//! API-facing request/response models.
//!
//! Routing and transport stay with the caller; these functions resolve the
//! farm, run the operation, and map errors into a serializable shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    AllocationSnapshot, CycleSpec, CycleStore, ErrorClass, FarmDirectory, PendingCycleView,
    Placement, QueueStore, ReleaseOutcome, SchedulerError, ShelfRegistry,
};
use crate::util::serde::{CycleId, FarmId, ShelfRef};

/// Planting request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantRequest {
    /// Farm to plant on.
    pub farm_id: FarmId,
    /// Crop and shelf request.
    #[serde(flatten)]
    pub spec: CycleSpec,
}

/// Planting response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantResponse {
    /// Identifier of the new cycle.
    pub cycle_id: CycleId,
    /// Where the cycle ended up.
    pub placement: Placement,
}

/// Error payload returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error class.
    pub class: ErrorClass,
    /// Whether retrying the same request may succeed.
    pub retryable: bool,
    /// Human-readable message.
    pub message: String,
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        Self {
            class: err.class(),
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Provisioned farms.
    pub farms: usize,
}

/// Pending cycles of a farm: queued cycles grouped by shelf, head first.
pub fn pending_cycles<R, C, Q>(
    directory: &FarmDirectory<R, C, Q>,
    farm_id: &FarmId,
    now: DateTime<Utc>,
) -> Result<Vec<PendingCycleView>, ApiError>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    Ok(directory.get(farm_id)?.pending_view(now))
}

/// Shelf totals and active cycles of a farm.
pub fn allocation_snapshot<R, C, Q>(
    directory: &FarmDirectory<R, C, Q>,
    farm_id: &FarmId,
) -> Result<AllocationSnapshot, ApiError>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    Ok(directory.get(farm_id)?.allocation_view())
}

/// Create a cycle and place it: bind shelves, queue, or report the shortfall.
///
/// An unsatisfied cycle stays `INITIALIZED` and can be placed again later.
/// A rejected request leaves nothing behind.
pub fn plant<R, C, Q>(
    directory: &FarmDirectory<R, C, Q>,
    req: PlantRequest,
    now: DateTime<Utc>,
) -> Result<PlantResponse, ApiError>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    let farm = directory.get(&req.farm_id)?;
    let (cycle, placement) = farm.plant(req.spec, now)?;
    Ok(PlantResponse {
        cycle_id: cycle.cycle_id,
        placement,
    })
}

/// Cancel a cycle; returns the cycles promoted onto its shelves.
pub fn cancel<R, C, Q>(
    directory: &FarmDirectory<R, C, Q>,
    farm_id: &FarmId,
    cycle_id: &CycleId,
    now: DateTime<Utc>,
) -> Result<Vec<CycleId>, ApiError>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    Ok(directory.get(farm_id)?.cancel(cycle_id, now)?)
}

/// Harvest a cycle; returns the cycles promoted onto its shelves.
pub fn harvest<R, C, Q>(
    directory: &FarmDirectory<R, C, Q>,
    farm_id: &FarmId,
    cycle_id: &CycleId,
    now: DateTime<Utc>,
) -> Result<Vec<CycleId>, ApiError>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    Ok(directory.get(farm_id)?.harvest(cycle_id, now)?)
}

/// Release one shelf held by a cycle.
pub fn release<R, C, Q>(
    directory: &FarmDirectory<R, C, Q>,
    farm_id: &FarmId,
    cycle_id: &CycleId,
    shelf: &ShelfRef,
    now: DateTime<Utc>,
) -> Result<ReleaseOutcome, ApiError>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    Ok(directory.get(farm_id)?.release(cycle_id, shelf, now)?)
}

/// Return a health payload.
pub fn health<R, C, Q>(directory: &FarmDirectory<R, C, Q>) -> Health {
    Health {
        ok: true,
        farms: directory.len(),
    }
}
