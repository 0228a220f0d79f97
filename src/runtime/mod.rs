//! Request/response surface over a farm directory and background tasks.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod expiry;

pub use api::{
    allocation_snapshot, cancel, harvest, health, pending_cycles, plant, release, ApiError,
    Health, PlantRequest, PlantResponse,
};
#[cfg(feature = "tokio-runtime")]
pub use expiry::{spawn_expiry_sweeper, ExpirySweeper};
