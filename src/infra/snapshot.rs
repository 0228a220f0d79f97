//! JSON snapshots of a farm's state, so in-memory farms survive restarts.
//!
//! A snapshot is written to a temporary sibling file and renamed into place,
//! so a crash mid-write leaves the previous snapshot intact.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QueuePolicy;
use crate::core::{
    AppResult, CropCycle, CycleStore, Farm, QueueEntry, QueueStore, SchedulerError, Shelf,
    ShelfRegistry,
};
use crate::infra::{InMemoryCycleStore, InMemoryQueue, InMemoryRegistry, MemoryFarm};
use crate::util::serde::FarmId;

/// Point-in-time copy of one farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmSnapshot {
    /// Farm identifier.
    pub farm_id: FarmId,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Every shelf with its occupancy.
    pub shelves: Vec<Shelf>,
    /// Every cycle, including finished ones.
    pub cycles: Vec<CropCycle>,
    /// Queue entries, head first per shelf.
    pub queue: Vec<QueueEntry>,
}

impl FarmSnapshot {
    /// Copy a farm's state under its lock.
    pub fn capture<R, C, Q>(farm: &Farm<R, C, Q>, taken_at: DateTime<Utc>) -> Self
    where
        R: ShelfRegistry,
        C: CycleStore,
        Q: QueueStore,
    {
        farm.read(|state| Self {
            farm_id: farm.farm_id().clone(),
            taken_at,
            shelves: state.registry.list(),
            cycles: state.cycles.list(),
            queue: state.queue.all(),
        })
    }

    /// Write the snapshot as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        {
            let file = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self).context("encoding snapshot")?;
            writer.flush().context("flushing snapshot")?;
        }
        fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        tracing::debug!(farm_id = %self.farm_id, path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Read a snapshot written by [`FarmSnapshot::save`].
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("decoding snapshot {}", path.display()))
    }

    /// Rebuild an in-memory farm, keeping occupancy, lifecycle, and queue order.
    ///
    /// Rejects snapshots where a shelf's occupant disagrees with the cycle records.
    pub fn restore(self, policy: QueuePolicy) -> Result<MemoryFarm, SchedulerError> {
        let registry = InMemoryRegistry::from_records(self.shelves)?;
        let cycles = InMemoryCycleStore::from_records(self.cycles)?;
        for shelf in registry.list() {
            if let Some(occupant) = &shelf.occupant_cycle_id {
                let cycle = cycles.get(occupant)?;
                if !cycle.shelves.contains(&shelf.location) {
                    return Err(SchedulerError::InvalidLayout(format!(
                        "shelf {} occupied by {occupant} which does not list it",
                        shelf.location
                    )));
                }
            }
        }
        for entry in &self.queue {
            registry.get(&entry.target_shelf)?;
            cycles.get(&entry.cycle_id)?;
        }
        let queue = InMemoryQueue::from_entries(self.queue)?;
        tracing::info!(farm_id = %self.farm_id, shelves = registry.len(), queued = queue.len(), "farm restored from snapshot");
        Ok(Farm::new(self.farm_id, policy, registry, cycles, queue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FarmLayout;
    use crate::core::{CycleSpec, CycleStatus};
    use crate::infra::memory_farm;
    use crate::util::serde::{CycleId, ShelfRef};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn round_trip_keeps_queue_order_and_occupancy() {
        let farm = memory_farm(&FarmLayout::uniform("farm-a", 1, 1), QueuePolicy::default()).unwrap();
        let shelf = ShelfRef::new("R1", "S1");
        for id in ["C1", "C2", "C3"] {
            farm.create_cycle(CycleSpec::new("Basil", 1, 14).with_id(id), t0()).unwrap();
            farm.place(&CycleId::new(id), t0()).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm-a.json");
        FarmSnapshot::capture(&farm, t0()).save(&path).unwrap();

        let restored = FarmSnapshot::load(&path)
            .unwrap()
            .restore(QueuePolicy::default())
            .unwrap();
        assert_eq!(restored.queue_position(&CycleId::new("C2")), Some(1));
        assert_eq!(restored.queue_position(&CycleId::new("C3")), Some(2));

        let later = t0() + chrono::Duration::days(14);
        restored
            .advance_stage(&CycleId::new("C1"), CycleStatus::Growing, later)
            .unwrap();
        let promoted = restored.harvest(&CycleId::new("C1"), later).unwrap();
        assert_eq!(promoted, vec![CycleId::new("C2")]);
        assert_eq!(
            restored.cycle(&CycleId::new("C2")).unwrap().shelves,
            vec![shelf]
        );
        assert!(matches!(
            restored.place(&CycleId::new("C3"), later),
            Err(SchedulerError::AlreadyQueued { .. })
        ));
    }

    #[test]
    fn inconsistent_occupant_rejected() {
        let mut shelf = Shelf::free(ShelfRef::new("R1", "S1"));
        shelf.status = crate::core::ShelfStatus::Occupied;
        shelf.occupant_cycle_id = Some(CycleId::new("ghost"));
        shelf.occupied_until = Some(t0());
        let snapshot = FarmSnapshot {
            farm_id: FarmId::new("farm-a"),
            taken_at: t0(),
            shelves: vec![shelf],
            cycles: Vec::new(),
            queue: Vec::new(),
        };
        assert!(matches!(
            snapshot.restore(QueuePolicy::default()),
            Err(SchedulerError::CycleNotFound(_))
        ));
    }
}
