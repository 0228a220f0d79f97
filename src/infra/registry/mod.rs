//! Shelf registry backends.

pub mod memory;

pub use memory::InMemoryRegistry;
