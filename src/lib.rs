//! # Rack Scheduler
//!
//! Shelf allocation and per-shelf wait queues for vertical farms.
//!
//! A farm is a fixed grid of racks and shelves. Growers create crop cycles
//! that each need some number of shelves. The allocator binds free shelves to
//! a cycle all-or-nothing; when the shelf a grower wants is occupied, the
//! cycle parks in that shelf's FIFO queue and is promoted automatically the
//! moment the shelf is released, harvested, or cancelled.
//!
//! ## Guarantees
//!
//! - A shelf is bound to at most one active cycle.
//! - Queue positions are contiguous from 1 and follow arrival order.
//! - A freed shelf with waiters is handed to the queue head before anyone
//!   else can observe it as free.
//! - Releasing the same shelf twice promotes at most once.
//!
//! ## Example
//!
//! ```rust
//! use rack_scheduler::config::{FarmLayout, QueuePolicy};
//! use rack_scheduler::core::{CycleSpec, CycleStatus, Placement};
//! use rack_scheduler::infra::memory_farm;
//! use rack_scheduler::util::clock;
//!
//! let farm = memory_farm(&FarmLayout::uniform("farm-a", 1, 1), QueuePolicy::default())?;
//! let now = clock::now();
//!
//! let first = farm.create_cycle(CycleSpec::new("Basil", 1, 21), now)?;
//! assert!(matches!(farm.place(&first.cycle_id, now)?, Placement::Bound { .. }));
//!
//! let second = farm.create_cycle(CycleSpec::new("Kale", 1, 28), now)?;
//! assert!(matches!(
//!     farm.place(&second.cycle_id, now)?,
//!     Placement::Queued { queue_position: 1, .. }
//! ));
//!
//! farm.advance_stage(&first.cycle_id, CycleStatus::Growing, now)?;
//! let promoted = farm.harvest(&first.cycle_id, now)?;
//! assert_eq!(promoted, vec![second.cycle_id]);
//! # Ok::<(), rack_scheduler::core::SchedulerError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core allocation, lifecycle, and queueing abstractions.
pub mod core;
/// Configuration models for farm layouts and queue policy.
pub mod config;
/// Builders to construct farms from configuration.
pub mod builders;
/// Store backends and persistence helpers.
pub mod infra;
/// Request/response surface and background tasks.
pub mod runtime;
/// Shared utilities.
pub mod util;
