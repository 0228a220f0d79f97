//! In-memory shelf registry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::core::{SchedulerError, Shelf, ShelfRegistry, ShelfStatus};
use crate::util::serde::{CycleId, ShelfRef};

/// Shelf registry held in a sorted map, so listing is already in allocation order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    shelves: BTreeMap<ShelfRef, Shelf>,
}

impl InMemoryRegistry {
    /// Provision free shelves. Duplicate addresses are rejected.
    pub fn with_shelves(
        locations: impl IntoIterator<Item = ShelfRef>,
    ) -> Result<Self, SchedulerError> {
        let mut shelves = BTreeMap::new();
        for location in locations {
            if shelves.contains_key(&location) {
                return Err(SchedulerError::InvalidLayout(format!(
                    "duplicate shelf {location}"
                )));
            }
            shelves.insert(location.clone(), Shelf::free(location));
        }
        Ok(Self { shelves })
    }

    /// Rebuild from stored records, keeping their occupancy.
    pub fn from_records(records: impl IntoIterator<Item = Shelf>) -> Result<Self, SchedulerError> {
        let mut shelves = BTreeMap::new();
        for shelf in records {
            if shelf.is_free() != shelf.occupant_cycle_id.is_none() {
                return Err(SchedulerError::InvalidLayout(format!(
                    "shelf {} status disagrees with occupant",
                    shelf.location
                )));
            }
            if shelves.insert(shelf.location.clone(), shelf).is_some() {
                return Err(SchedulerError::InvalidLayout("duplicate shelf record".into()));
            }
        }
        Ok(Self { shelves })
    }
}

impl ShelfRegistry for InMemoryRegistry {
    fn get(&self, shelf: &ShelfRef) -> Result<Shelf, SchedulerError> {
        self.shelves
            .get(shelf)
            .cloned()
            .ok_or_else(|| SchedulerError::ShelfNotFound(shelf.clone()))
    }

    fn mark_occupied(
        &mut self,
        shelf: &ShelfRef,
        cycle: &CycleId,
        until: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let record = self
            .shelves
            .get_mut(shelf)
            .ok_or_else(|| SchedulerError::ShelfNotFound(shelf.clone()))?;
        match &record.occupant_cycle_id {
            Some(occupant) if occupant != cycle => Err(SchedulerError::AlreadyOccupied {
                shelf: shelf.clone(),
                occupant: occupant.clone(),
            }),
            _ => {
                record.status = ShelfStatus::Occupied;
                record.occupant_cycle_id = Some(cycle.clone());
                record.occupied_until = Some(until);
                Ok(())
            }
        }
    }

    fn mark_free(&mut self, shelf: &ShelfRef) -> Result<Shelf, SchedulerError> {
        let record = self
            .shelves
            .get_mut(shelf)
            .ok_or_else(|| SchedulerError::ShelfNotFound(shelf.clone()))?;
        if record.is_free() {
            return Err(SchedulerError::NotOccupied(shelf.clone()));
        }
        let previous = record.clone();
        record.status = ShelfStatus::Free;
        record.occupant_cycle_id = None;
        record.occupied_until = None;
        Ok(previous)
    }

    fn list(&self) -> Vec<Shelf> {
        self.shelves.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.shelves.len()
    }
}
