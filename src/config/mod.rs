//! Configuration models for farm layouts and queue policy.

pub mod farm;

pub use farm::{FarmLayout, QueuePolicy, RackLayout, SchedulerConfig, CONFIG_PATH_ENV};
