//! Queue entries for cycles waiting on an occupied shelf, and the queue store abstraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cycle::CycleStatus;
use crate::core::SchedulerError;
use crate::util::serde::{CycleId, ShelfRef};

/// One cycle waiting for one contended shelf.
///
/// Entries for the same shelf are ordered by `(queued_at, seq)`; `seq` is
/// assigned by the store on insertion so equal timestamps keep FIFO order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Waiting cycle.
    pub cycle_id: CycleId,
    /// Shelf it waits for.
    pub target_shelf: ShelfRef,
    /// Arrival time.
    pub queued_at: DateTime<Utc>,
    /// Insertion sequence, the tie-break for equal `queued_at`.
    pub seq: u64,
    /// Stage the cycle resumes at once granted.
    pub will_start_from: CycleStatus,
}

impl QueueEntry {
    /// Build an entry resuming at `TRANSPLANT`. `seq` is set by the store.
    #[must_use]
    pub fn new(cycle_id: CycleId, target_shelf: ShelfRef, queued_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            target_shelf,
            queued_at,
            seq: 0,
            will_start_from: CycleStatus::Transplant,
        }
    }

    /// Override the resume stage.
    #[must_use]
    pub fn starting_from(mut self, stage: CycleStatus) -> Self {
        self.will_start_from = stage;
        self
    }

    /// FIFO sort key.
    #[must_use]
    pub const fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.queued_at, self.seq)
    }
}

/// Store of wait queues, one per contended shelf.
pub trait QueueStore {
    /// Insert an entry, assigning its `seq`, and return it as stored.
    ///
    /// A cycle holds at most one entry; a second insert fails with `AlreadyQueued`.
    fn push(&mut self, entry: QueueEntry) -> Result<QueueEntry, SchedulerError>;

    /// The entry held by `cycle`, if any.
    fn entry_for(&self, cycle: &CycleId) -> Option<QueueEntry>;

    /// Remove and return the entry held by `cycle`.
    fn remove(&mut self, cycle: &CycleId) -> Option<QueueEntry>;

    /// Entries waiting for `shelf`, head first.
    fn waiting_for(&self, shelf: &ShelfRef) -> Vec<QueueEntry>;

    /// Every entry, grouped by shelf in shelf order, head first within a shelf.
    fn all(&self) -> Vec<QueueEntry>;

    /// Total number of entries.
    fn len(&self) -> usize;

    /// Whether no cycle is waiting.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entry that would be promoted next for `shelf`.
    fn head(&self, shelf: &ShelfRef) -> Option<QueueEntry> {
        self.waiting_for(shelf).into_iter().next()
    }

    /// Number of entries waiting for `shelf`.
    fn depth(&self, shelf: &ShelfRef) -> usize {
        self.waiting_for(shelf).len()
    }

    /// 1-based rank of `cycle` among the entries for its target shelf.
    fn position(&self, cycle: &CycleId) -> Option<usize> {
        let entry = self.entry_for(cycle)?;
        self.waiting_for(&entry.target_shelf)
            .iter()
            .position(|e| &e.cycle_id == cycle)
            .map(|idx| idx + 1)
    }

    /// Remove and return the head of `shelf`'s queue.
    fn pop_head(&mut self, shelf: &ShelfRef) -> Option<QueueEntry> {
        let head = self.head(shelf)?;
        self.remove(&head.cycle_id)
    }

    /// Entries queued at or before `cutoff`.
    fn queued_before(&self, cutoff: DateTime<Utc>) -> Vec<QueueEntry> {
        self.all()
            .into_iter()
            .filter(|e| e.queued_at <= cutoff)
            .collect()
    }
}
