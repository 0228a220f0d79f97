//! Builders to construct farms from configuration.

pub mod farm_builder;

pub use farm_builder::{build_directory, build_memory_directory};
