//! In-memory cycle store.

use std::collections::HashMap;

use crate::core::{CropCycle, CycleStore, SchedulerError};
use crate::util::serde::CycleId;

/// Cycle store keeping records in a map plus an insertion-order index.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCycleStore {
    cycles: HashMap<CycleId, CropCycle>,
    order: Vec<CycleId>,
}

impl InMemoryCycleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored records, in the given order.
    pub fn from_records(records: impl IntoIterator<Item = CropCycle>) -> Result<Self, SchedulerError> {
        let mut store = Self::new();
        for cycle in records {
            store.insert(cycle)?;
        }
        Ok(store)
    }
}

impl CycleStore for InMemoryCycleStore {
    fn insert(&mut self, cycle: CropCycle) -> Result<(), SchedulerError> {
        if self.cycles.contains_key(&cycle.cycle_id) {
            return Err(SchedulerError::DuplicateCycle(cycle.cycle_id));
        }
        self.order.push(cycle.cycle_id.clone());
        self.cycles.insert(cycle.cycle_id.clone(), cycle);
        Ok(())
    }

    fn get(&self, id: &CycleId) -> Result<CropCycle, SchedulerError> {
        self.cycles
            .get(id)
            .cloned()
            .ok_or_else(|| SchedulerError::CycleNotFound(id.clone()))
    }

    fn update(&mut self, cycle: CropCycle) -> Result<(), SchedulerError> {
        match self.cycles.get_mut(&cycle.cycle_id) {
            Some(slot) => {
                *slot = cycle;
                Ok(())
            }
            None => Err(SchedulerError::CycleNotFound(cycle.cycle_id)),
        }
    }

    fn list(&self) -> Vec<CropCycle> {
        self.order
            .iter()
            .filter_map(|id| self.cycles.get(id).cloned())
            .collect()
    }

    fn remove(&mut self, id: &CycleId) -> Result<CropCycle, SchedulerError> {
        let cycle = self
            .cycles
            .remove(id)
            .ok_or_else(|| SchedulerError::CycleNotFound(id.clone()))?;
        self.order.retain(|existing| existing != id);
        Ok(cycle)
    }
}
