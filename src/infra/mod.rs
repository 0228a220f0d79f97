//! Store backends for shelves, cycles, and queues, plus persistence helpers.

pub mod cycles;
pub mod postgres;
pub mod queue;
pub mod registry;
pub mod snapshot;

pub use cycles::InMemoryCycleStore;
pub use queue::InMemoryQueue;
pub use registry::InMemoryRegistry;
pub use snapshot::FarmSnapshot;

use crate::config::{FarmLayout, QueuePolicy};
use crate::core::{Farm, FarmDirectory, SchedulerError};

/// Farm backed entirely by in-memory stores.
pub type MemoryFarm = Farm<InMemoryRegistry, InMemoryCycleStore, InMemoryQueue>;

/// Directory of in-memory farms.
pub type MemoryDirectory = FarmDirectory<InMemoryRegistry, InMemoryCycleStore, InMemoryQueue>;

/// Provision an in-memory farm from a layout.
pub fn memory_farm(layout: &FarmLayout, policy: QueuePolicy) -> Result<MemoryFarm, SchedulerError> {
    layout.validate().map_err(SchedulerError::InvalidLayout)?;
    Ok(Farm::new(
        layout.farm_id.clone(),
        policy,
        InMemoryRegistry::with_shelves(layout.shelf_refs())?,
        InMemoryCycleStore::new(),
        InMemoryQueue::new(),
    ))
}
