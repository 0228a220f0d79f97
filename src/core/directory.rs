//! Lookup of farms by identifier.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::farm::Farm;
use crate::core::SchedulerError;
use crate::util::serde::FarmId;

/// Shared map of provisioned farms.
///
/// The directory lock only guards the map; each farm has its own lock, so
/// requests against different farms never contend.
pub struct FarmDirectory<R, C, Q> {
    farms: RwLock<HashMap<FarmId, Arc<Farm<R, C, Q>>>>,
}

impl<R, C, Q> Default for FarmDirectory<R, C, Q> {
    fn default() -> Self {
        Self {
            farms: RwLock::new(HashMap::new()),
        }
    }
}

impl<R, C, Q> FarmDirectory<R, C, Q> {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a farm; an existing farm with the same id is an error.
    pub fn insert(&self, farm: Farm<R, C, Q>) -> Result<Arc<Farm<R, C, Q>>, SchedulerError> {
        let mut farms = self.farms.write();
        if farms.contains_key(farm.farm_id()) {
            return Err(SchedulerError::InvalidLayout(format!(
                "farm `{}` already provisioned",
                farm.farm_id()
            )));
        }
        let farm = Arc::new(farm);
        farms.insert(farm.farm_id().clone(), Arc::clone(&farm));
        Ok(farm)
    }

    /// Fetch a farm.
    pub fn get(&self, farm_id: &FarmId) -> Result<Arc<Farm<R, C, Q>>, SchedulerError> {
        self.farms
            .read()
            .get(farm_id)
            .cloned()
            .ok_or_else(|| SchedulerError::FarmNotFound(farm_id.clone()))
    }

    /// Every farm, ordered by id.
    pub fn farms(&self) -> Vec<Arc<Farm<R, C, Q>>> {
        let mut farms: Vec<_> = self.farms.read().values().cloned().collect();
        farms.sort_by(|a, b| a.farm_id().cmp(b.farm_id()));
        farms
    }

    /// Number of farms.
    pub fn len(&self) -> usize {
        self.farms.read().len()
    }

    /// Whether no farm is provisioned.
    pub fn is_empty(&self) -> bool {
        self.farms.read().is_empty()
    }
}
