//! Provision a farm directory from scheduler configuration.

use crate::config::{FarmLayout, QueuePolicy, SchedulerConfig};
use crate::core::{Farm, FarmDirectory, SchedulerError};
use crate::infra::{memory_farm, MemoryDirectory};

/// Build every configured farm with the provided factory and collect them
/// into a directory.
pub fn build_directory<R, C, Q, F>(
    cfg: &SchedulerConfig,
    mut farm_factory: F,
) -> Result<FarmDirectory<R, C, Q>, SchedulerError>
where
    F: FnMut(&FarmLayout, &QueuePolicy) -> Result<Farm<R, C, Q>, SchedulerError>,
{
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidLayout(format!("config invalid: {e}")))?;

    let directory = FarmDirectory::new();
    for layout in &cfg.farms {
        let farm = farm_factory(layout, &cfg.queue)?;
        if farm.farm_id() != &layout.farm_id {
            return Err(SchedulerError::InvalidLayout(format!(
                "factory built `{}` for layout `{}`",
                farm.farm_id(),
                layout.farm_id
            )));
        }
        directory.insert(farm)?;
        tracing::info!(farm_id = %layout.farm_id, shelves = layout.shelf_refs().count(), "farm provisioned");
    }

    Ok(directory)
}

/// Build a directory of in-memory farms.
pub fn build_memory_directory(cfg: &SchedulerConfig) -> Result<MemoryDirectory, SchedulerError> {
    build_directory(cfg, |layout, policy| memory_farm(layout, policy.clone()))
}
