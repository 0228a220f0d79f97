//! Cycle store backends.

pub mod memory;

pub use memory::InMemoryCycleStore;
