//! Core allocation and queueing abstractions.

pub mod allocator;
pub mod audit;
pub mod cycle;
pub mod directory;
pub mod error;
pub mod farm;
pub mod projection;
pub mod queue;
pub mod registry;

pub use allocator::{plan_allocation, AllocationResult};
pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use cycle::{CropCycle, CycleSpec, CycleStatus, CycleStore, MAX_GROWING_DAYS};
pub use directory::FarmDirectory;
pub use error::{AppResult, ErrorClass, SchedulerError};
pub use farm::{Farm, FarmState, Placement, ReleaseOutcome};
pub use projection::{
    allocation_snapshot, pending_cycles, AllocationSnapshot, PendingCycleView, WaitingForShelf,
    UNKNOWN_CROP,
};
pub use queue::{QueueEntry, QueueStore};
pub use registry::{Shelf, ShelfRegistry, ShelfStatus};
