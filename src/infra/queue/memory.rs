//! In-memory per-shelf FIFO queues.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::{QueueEntry, QueueStore, SchedulerError};
use crate::util::serde::{CycleId, ShelfRef};

/// Wrapper to make `QueueEntry` orderable by arrival, then insertion sequence.
#[derive(Debug, Clone)]
struct FifoEntry {
    entry: QueueEntry,
}

impl PartialEq for FifoEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FifoEntry {}

impl PartialOrd for FifoEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FifoEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier queued_at first; seq is unique per store so it settles ties.
        self.entry
            .order_key()
            .cmp(&other.entry.order_key())
            .then_with(|| self.entry.cycle_id.cmp(&other.entry.cycle_id))
    }
}

/// In-memory queue store: one ordered set per contended shelf plus a cycle index.
#[derive(Debug, Default, Clone)]
pub struct InMemoryQueue {
    queues: BTreeMap<ShelfRef, BTreeSet<FifoEntry>>,
    by_cycle: HashMap<CycleId, QueueEntry>,
    next_seq: u64,
}

impl InMemoryQueue {
    /// Create an empty queue store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored entries, keeping their sequence numbers.
    pub fn from_entries(entries: impl IntoIterator<Item = QueueEntry>) -> Result<Self, SchedulerError> {
        let mut store = Self::new();
        for entry in entries {
            if store.by_cycle.contains_key(&entry.cycle_id) {
                return Err(SchedulerError::AlreadyQueued {
                    cycle: entry.cycle_id,
                    shelf: entry.target_shelf,
                });
            }
            store.next_seq = store.next_seq.max(entry.seq + 1);
            store.insert(entry);
        }
        Ok(store)
    }

    fn insert(&mut self, entry: QueueEntry) {
        self.by_cycle.insert(entry.cycle_id.clone(), entry.clone());
        self.queues
            .entry(entry.target_shelf.clone())
            .or_default()
            .insert(FifoEntry { entry });
    }
}

impl QueueStore for InMemoryQueue {
    fn push(&mut self, mut entry: QueueEntry) -> Result<QueueEntry, SchedulerError> {
        if let Some(existing) = self.by_cycle.get(&entry.cycle_id) {
            return Err(SchedulerError::AlreadyQueued {
                cycle: entry.cycle_id,
                shelf: existing.target_shelf.clone(),
            });
        }
        entry.seq = self.next_seq;
        self.next_seq += 1;
        self.insert(entry.clone());
        Ok(entry)
    }

    fn entry_for(&self, cycle: &CycleId) -> Option<QueueEntry> {
        self.by_cycle.get(cycle).cloned()
    }

    fn remove(&mut self, cycle: &CycleId) -> Option<QueueEntry> {
        let entry = self.by_cycle.remove(cycle)?;
        if let Some(set) = self.queues.get_mut(&entry.target_shelf) {
            set.remove(&FifoEntry {
                entry: entry.clone(),
            });
            if set.is_empty() {
                self.queues.remove(&entry.target_shelf);
            }
        }
        Some(entry)
    }

    fn waiting_for(&self, shelf: &ShelfRef) -> Vec<QueueEntry> {
        self.queues
            .get(shelf)
            .map(|set| set.iter().map(|f| f.entry.clone()).collect())
            .unwrap_or_default()
    }

    fn all(&self) -> Vec<QueueEntry> {
        self.queues
            .values()
            .flat_map(|set| set.iter().map(|f| f.entry.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.by_cycle.len()
    }

    fn head(&self, shelf: &ShelfRef) -> Option<QueueEntry> {
        self.queues
            .get(shelf)
            .and_then(|set| set.first())
            .map(|f| f.entry.clone())
    }

    fn depth(&self, shelf: &ShelfRef) -> usize {
        self.queues.get(shelf).map_or(0, BTreeSet::len)
    }
}
