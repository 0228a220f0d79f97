//! A farm's shelf inventory, crop cycles, and wait queues behind one lock.
//!
//! Every mutating operation takes the farm lock once, validates, applies,
//! and releases it; there is no I/O inside the critical section beyond the
//! synchronous store calls. Audit events are collected while the lock is
//! held and flushed to the sink after it is released.
//!
//! Queue promotion happens inside the same critical section as the release
//! that triggers it. A shelf freed without promotion (`mark_free`) stays
//! reserved for its queue head, so direct allocation never overtakes a
//! waiting cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::QueuePolicy;
use crate::core::allocator::{plan_allocation, AllocationResult};
use crate::core::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, CropCycle, CycleSpec, CycleStatus,
    CycleStore, QueueEntry, QueueStore, SchedulerError, ShelfRegistry,
};
use crate::util::serde::{CycleId, FarmId, ShelfRef};

/// Where a planting request ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Placement {
    /// Bound to shelves.
    Bound {
        /// Bound shelves.
        shelves: Vec<ShelfRef>,
    },
    /// Waiting for an occupied shelf.
    Queued {
        /// Shelf waited for.
        target: ShelfRef,
        /// 1-based rank in that shelf's queue.
        queue_position: usize,
    },
    /// Neither bound nor queued.
    Unsatisfied {
        /// Shelves missing to satisfy the request.
        shortfall: u32,
    },
}

/// Result of releasing a shelf.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// Whether this call freed the shelf.
    pub freed: bool,
    /// Cycle promoted onto the shelf, if any.
    pub promoted: Option<CycleId>,
}

/// Stores guarded by the farm lock.
pub struct FarmState<R, C, Q> {
    /// Shelf occupancy.
    pub registry: R,
    /// Crop cycles.
    pub cycles: C,
    /// Wait queues.
    pub queue: Q,
}

struct Journal {
    farm_id: FarmId,
    events: Vec<AuditEvent>,
}

impl Journal {
    fn push(
        &mut self,
        cycle: &CycleId,
        action: AuditAction,
        shelf: Option<&ShelfRef>,
        at: DateTime<Utc>,
    ) {
        self.events
            .push(build_audit_event(&self.farm_id, cycle, action, shelf, at));
    }
}

/// One farm: its registry, cycle store, and queue store behind a single mutex.
pub struct Farm<R, C, Q> {
    farm_id: FarmId,
    policy: QueuePolicy,
    state: Mutex<FarmState<R, C, Q>>,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
}

impl<R, C, Q> Farm<R, C, Q> {
    /// Assemble a farm from its stores.
    pub fn new(farm_id: FarmId, policy: QueuePolicy, registry: R, cycles: C, queue: Q) -> Self {
        Self {
            farm_id,
            policy,
            state: Mutex::new(FarmState {
                registry,
                cycles,
                queue,
            }),
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// Attach an audit sink shared with other farms.
    #[must_use]
    pub fn with_shared_audit(mut self, audit: Arc<Mutex<Box<dyn AuditSink>>>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Farm identifier.
    pub const fn farm_id(&self) -> &FarmId {
        &self.farm_id
    }

    /// Queue policy in force.
    pub const fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    /// Run `f` against a consistent view of the farm.
    pub fn read<T>(&self, f: impl FnOnce(&FarmState<R, C, Q>) -> T) -> T {
        let state = self.state.lock();
        f(&state)
    }

    fn journal(&self) -> Journal {
        Journal {
            farm_id: self.farm_id.clone(),
            events: Vec::new(),
        }
    }

    fn flush(&self, journal: Journal) {
        if journal.events.is_empty() {
            return;
        }
        if let Some(audit_sink) = &self.audit {
            let mut sink = audit_sink.lock();
            for event in journal.events {
                sink.record(event);
            }
        }
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut FarmState<R, C, Q>, &QueuePolicy, &mut Journal) -> T,
    ) -> T {
        let mut journal = self.journal();
        let out = {
            let mut state = self.state.lock();
            op(&mut state, &self.policy, &mut journal)
        };
        self.flush(journal);
        out
    }
}

impl<R, C, Q> Farm<R, C, Q>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    /// Register a planting request. The cycle starts unbound.
    pub fn create_cycle(&self, spec: CycleSpec, now: DateTime<Utc>) -> Result<CropCycle, SchedulerError> {
        let farm_id = self.farm_id.clone();
        self.mutate(|state, _, journal| -> Result<CropCycle, SchedulerError> {
            let cycle = state.cycles.create(spec, now)?;
            tracing::info!(farm_id = %farm_id, cycle_id = %cycle.cycle_id, crop = %cycle.crop_name, "cycle created");
            journal.push(&cycle.cycle_id, AuditAction::Create, None, now);
            Ok(cycle)
        })
    }

    /// Register a planting request and place it in one step.
    ///
    /// If placement fails the cycle is discarded, so a retry with the same
    /// identifier starts from scratch.
    pub fn plant(&self, spec: CycleSpec, now: DateTime<Utc>) -> Result<(CropCycle, Placement), SchedulerError> {
        let farm_id = self.farm_id.clone();
        self.mutate(|state, policy, journal| -> Result<(CropCycle, Placement), SchedulerError> {
            let mark = journal.events.len();
            let cycle = state.cycles.create(spec, now)?;
            journal.push(&cycle.cycle_id, AuditAction::Create, None, now);

            match state.place(policy, &cycle.cycle_id, now, journal) {
                Ok(placement) => {
                    tracing::info!(farm_id = %farm_id, cycle_id = %cycle.cycle_id, crop = %cycle.crop_name, ?placement, "cycle planted");
                    Ok((cycle, placement))
                }
                Err(err) => {
                    tracing::warn!(farm_id = %farm_id, cycle_id = %cycle.cycle_id, error = %err, "planting rejected; cycle discarded");
                    state.cycles.remove(&cycle.cycle_id)?;
                    journal.events.truncate(mark);
                    Err(err)
                }
            }
        })
    }

    /// Bind `requested` free shelves to a cycle, or report the shortfall
    /// without side effects.
    pub fn allocate(
        &self,
        cycle_id: &CycleId,
        requested: u32,
        preferred: Option<&ShelfRef>,
        now: DateTime<Utc>,
    ) -> Result<AllocationResult, SchedulerError> {
        self.mutate(|state, _, journal| state.allocate(cycle_id, requested, preferred, now, journal))
    }

    /// Put a cycle in `target`'s wait queue.
    ///
    /// If the shelf turns out to be free with nobody ahead, the cycle is
    /// promoted straight away and `Placement::Bound` is returned. Once the
    /// entry is stored the call succeeds: a promotion that fails is logged
    /// and the cycle is reported as `Placement::Queued`.
    pub fn enqueue(
        &self,
        cycle_id: &CycleId,
        target: &ShelfRef,
        now: DateTime<Utc>,
    ) -> Result<Placement, SchedulerError> {
        self.mutate(|state, policy, journal| state.enqueue(policy, cycle_id, target, now, journal))
    }

    /// Allocate with the cycle's own request, queueing when it cannot be placed.
    ///
    /// Without a preferred shelf, single-shelf requests queue on the occupied
    /// shelf expected to free first; larger requests report their shortfall.
    pub fn place(&self, cycle_id: &CycleId, now: DateTime<Utc>) -> Result<Placement, SchedulerError> {
        self.mutate(|state, policy, journal| state.place(policy, cycle_id, now, journal))
    }

    /// Promote the head of `shelf`'s queue if the shelf is free.
    ///
    /// Returns the promoted cycle. Calling again after a promotion finds the
    /// shelf occupied and does nothing.
    pub fn on_shelf_freed(
        &self,
        shelf: &ShelfRef,
        now: DateTime<Utc>,
    ) -> Result<Option<CycleId>, SchedulerError> {
        self.mutate(|state, _, journal| state.promote(shelf, now, journal))
    }

    /// Clear a shelf's occupancy and detach it from its occupant.
    ///
    /// Returns the previous occupant; an already-free shelf is a no-op.
    /// This does not promote; pair with [`Farm::on_shelf_freed`] or use
    /// [`Farm::release`].
    pub fn mark_free(&self, shelf: &ShelfRef, now: DateTime<Utc>) -> Result<Option<CycleId>, SchedulerError> {
        self.mutate(|state, _, journal| state.free_shelf(shelf, now, journal))
    }

    /// Release `shelf` held by `cycle_id` and promote the next waiter.
    ///
    /// If the cycle no longer holds the shelf (a repeated release event), nothing changes.
    pub fn release(
        &self,
        cycle_id: &CycleId,
        shelf: &ShelfRef,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, SchedulerError> {
        self.mutate(|state, _, journal| state.release(cycle_id, shelf, now, journal))
    }

    /// Remove a cycle's queue entry. A missing entry is a no-op.
    pub fn dequeue(&self, cycle_id: &CycleId, now: DateTime<Utc>) -> Option<QueueEntry> {
        let farm_id = self.farm_id.clone();
        self.mutate(|state, _, journal| -> Option<QueueEntry> {
            let removed = state.queue.remove(cycle_id);
            match &removed {
                Some(entry) => {
                    tracing::info!(farm_id = %farm_id, cycle_id = %cycle_id, shelf = %entry.target_shelf, "queue entry removed");
                    journal.push(cycle_id, AuditAction::Dequeue, Some(&entry.target_shelf), now);
                }
                None => tracing::debug!(farm_id = %farm_id, cycle_id = %cycle_id, "dequeue of absent entry ignored"),
            }
            removed
        })
    }

    /// Cancel a cycle: drop its queue entry, free its shelves, and promote
    /// waiters on each freed shelf. Returns the promoted cycles.
    pub fn cancel(&self, cycle_id: &CycleId, now: DateTime<Utc>) -> Result<Vec<CycleId>, SchedulerError> {
        self.mutate(|state, _, journal| state.cancel(cycle_id, now, journal))
    }

    /// Harvest a growing cycle, free its shelves, and promote waiters.
    /// Returns the promoted cycles.
    pub fn harvest(&self, cycle_id: &CycleId, now: DateTime<Utc>) -> Result<Vec<CycleId>, SchedulerError> {
        self.mutate(|state, _, journal| state.harvest(cycle_id, now, journal))
    }

    /// Apply growth-stage progression from outside the allocator.
    ///
    /// `QUEUED` and `TRANSPLANT` are rejected; `HARVESTED` and `CANCELLED`
    /// route through [`Farm::harvest`] and [`Farm::cancel`].
    pub fn advance_stage(
        &self,
        cycle_id: &CycleId,
        to: CycleStatus,
        now: DateTime<Utc>,
    ) -> Result<CropCycle, SchedulerError> {
        self.mutate(|state, _, journal| -> Result<CropCycle, SchedulerError> {
            if !to.is_external_target() {
                let from = state.cycles.get(cycle_id)?.status;
                tracing::error!(cycle_id = %cycle_id, from = %from, to = %to, "stage reserved for allocator");
                return Err(SchedulerError::InvalidTransition {
                    cycle: cycle_id.clone(),
                    from,
                    to,
                });
            }
            match to {
                CycleStatus::Harvested => {
                    state.harvest(cycle_id, now, journal)?;
                }
                CycleStatus::Cancelled => {
                    state.cancel(cycle_id, now, journal)?;
                }
                _ => {
                    state.cycles.advance(cycle_id, to, now)?;
                }
            }
            state.cycles.get(cycle_id)
        })
    }

    /// Cancel queued cycles whose wait exceeded the configured timeout.
    ///
    /// Without a timeout this never removes anything.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> Result<Vec<CycleId>, SchedulerError> {
        self.mutate(|state, policy, journal| state.prune_expired(policy, now, journal))
    }

    /// Current record of one cycle.
    pub fn cycle(&self, cycle_id: &CycleId) -> Result<CropCycle, SchedulerError> {
        self.read(|state| state.cycles.get(cycle_id))
    }

    /// 1-based queue position of a cycle, if it is waiting.
    pub fn queue_position(&self, cycle_id: &CycleId) -> Option<usize> {
        self.read(|state| state.queue.position(cycle_id))
    }
}

impl<R, C, Q> FarmState<R, C, Q>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    fn allocate(
        &mut self,
        cycle_id: &CycleId,
        requested: u32,
        preferred: Option<&ShelfRef>,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<AllocationResult, SchedulerError> {
        let cycle = self.cycles.get(cycle_id)?;
        if !matches!(cycle.status, CycleStatus::Initialized | CycleStatus::Queued) {
            tracing::error!(cycle_id = %cycle_id, status = %cycle.status, "allocation outside INITIALIZED/QUEUED");
            return Err(SchedulerError::InvalidTransition {
                cycle: cycle_id.clone(),
                from: cycle.status,
                to: CycleStatus::Transplant,
            });
        }

        // A free shelf with waiters belongs to its queue head until promoted.
        let queue = &self.queue;
        let reserved = |shelf: &ShelfRef| queue.head(shelf).is_some_and(|head| head.cycle_id != *cycle_id);
        let shelves = match plan_allocation(&self.registry, requested, preferred, reserved)? {
            AllocationResult::Bound { shelves } => shelves,
            unsatisfied @ AllocationResult::Unsatisfied { .. } => {
                tracing::info!(cycle_id = %cycle_id, requested, ?unsatisfied, "allocation unsatisfied");
                return Ok(unsatisfied);
            }
        };

        self.bind(&cycle, &shelves, CycleStatus::Transplant, now)?;
        if let Some(entry) = self.queue.remove(cycle_id) {
            journal.push(cycle_id, AuditAction::Dequeue, Some(&entry.target_shelf), now);
        }
        tracing::info!(cycle_id = %cycle_id, shelves = shelves.len(), "cycle bound");
        journal.push(cycle_id, AuditAction::Allocate, single(&shelves), now);
        Ok(AllocationResult::Bound { shelves })
    }

    fn enqueue(
        &mut self,
        policy: &QueuePolicy,
        cycle_id: &CycleId,
        target: &ShelfRef,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Placement, SchedulerError> {
        let cycle = self.cycles.get(cycle_id)?;
        let shelf = self.registry.get(target)?;
        if let Some(existing) = self.queue.entry_for(cycle_id) {
            tracing::warn!(cycle_id = %cycle_id, shelf = %existing.target_shelf, "cycle already queued");
            return Err(SchedulerError::AlreadyQueued {
                cycle: cycle_id.clone(),
                shelf: existing.target_shelf,
            });
        }
        // A QUEUED cycle without an entry was dequeued directly and may re-queue.
        if cycle.status != CycleStatus::Queued && !cycle.status.can_transition_to(CycleStatus::Queued) {
            tracing::error!(cycle_id = %cycle_id, status = %cycle.status, "enqueue outside INITIALIZED");
            return Err(SchedulerError::InvalidTransition {
                cycle: cycle_id.clone(),
                from: cycle.status,
                to: CycleStatus::Queued,
            });
        }
        if self.queue.depth(target) >= policy.max_depth_per_shelf {
            tracing::warn!(cycle_id = %cycle_id, shelf = %target, depth = policy.max_depth_per_shelf, "shelf queue full");
            return Err(SchedulerError::QueueFull(target.clone()));
        }

        let entry = self.queue.push(
            QueueEntry::new(cycle_id.clone(), target.clone(), now)
                .starting_from(policy.will_start_from),
        )?;
        if let Err(err) = self.mark_queued(&cycle, target, now) {
            self.queue.remove(cycle_id);
            return Err(err);
        }
        tracing::info!(cycle_id = %cycle_id, shelf = %target, seq = entry.seq, "cycle queued");
        journal.push(cycle_id, AuditAction::Enqueue, Some(target), now);

        if shelf.is_free() {
            // The shelf was released between the failed allocation and this call.
            // The entry is committed either way; a failed bind leaves it waiting.
            if let Err(err) = self.promote(target, now, journal) {
                tracing::error!(cycle_id = %cycle_id, shelf = %target, error = %err, "promotion onto free shelf failed");
            }
        }
        self.placement_of(cycle_id)
    }

    fn mark_queued(&mut self, cycle: &CropCycle, target: &ShelfRef, now: DateTime<Utc>) -> Result<(), SchedulerError> {
        let mut queued = if cycle.status == CycleStatus::Queued {
            cycle.clone()
        } else {
            self.cycles.advance(&cycle.cycle_id, CycleStatus::Queued, now)?
        };
        queued.preferred_target = Some(target.clone());
        queued.updated_at = now;
        if let Err(err) = self.cycles.update(queued) {
            self.restore_cycle(cycle);
            return Err(err);
        }
        Ok(())
    }

    fn place(
        &mut self,
        policy: &QueuePolicy,
        cycle_id: &CycleId,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Placement, SchedulerError> {
        let cycle = self.cycles.get(cycle_id)?;
        let shortfall = match self.allocate(
            cycle_id,
            cycle.requested_shelf_count,
            cycle.preferred_target.as_ref(),
            now,
            journal,
        )? {
            AllocationResult::Bound { shelves } => return Ok(Placement::Bound { shelves }),
            AllocationResult::Unsatisfied { shortfall } => shortfall,
        };

        let target = match &cycle.preferred_target {
            Some(shelf) => Some(shelf.clone()),
            None if cycle.requested_shelf_count == 1 => self.soonest_available(),
            None => None,
        };
        match target {
            Some(shelf) => self.enqueue(policy, cycle_id, &shelf, now, journal),
            None => Ok(Placement::Unsatisfied { shortfall }),
        }
    }

    /// Occupied shelf with the earliest expected release, then the shortest queue.
    /// A free shelf still held for its waiters sorts ahead of every occupied one.
    fn soonest_available(&self) -> Option<ShelfRef> {
        self.registry
            .list()
            .into_iter()
            .filter(|s| !s.is_free() || self.queue.depth(&s.location) > 0)
            .min_by(|a, b| {
                (a.occupied_until, self.queue.depth(&a.location), &a.location).cmp(&(
                    b.occupied_until,
                    self.queue.depth(&b.location),
                    &b.location,
                ))
            })
            .map(|s| s.location)
    }

    fn placement_of(&self, cycle_id: &CycleId) -> Result<Placement, SchedulerError> {
        if let Some(entry) = self.queue.entry_for(cycle_id) {
            let queue_position = self.queue.position(cycle_id).unwrap_or(1);
            return Ok(Placement::Queued {
                target: entry.target_shelf,
                queue_position,
            });
        }
        let cycle = self.cycles.get(cycle_id)?;
        if cycle.shelves.is_empty() {
            Ok(Placement::Unsatisfied {
                shortfall: cycle.requested_shelf_count,
            })
        } else {
            Ok(Placement::Bound {
                shelves: cycle.shelves,
            })
        }
    }

    fn promote(
        &mut self,
        shelf: &ShelfRef,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Option<CycleId>, SchedulerError> {
        if !self.registry.get(shelf)?.is_free() {
            tracing::debug!(shelf = %shelf, "shelf occupied; nothing to promote");
            return Ok(None);
        }

        while let Some(head) = self.queue.head(shelf) {
            let cycle = match self.cycles.get(&head.cycle_id) {
                Ok(cycle) if cycle.status == CycleStatus::Queued => cycle,
                Ok(cycle) => {
                    tracing::error!(cycle_id = %head.cycle_id, status = %cycle.status, shelf = %shelf, "dropping queue entry of non-queued cycle");
                    self.queue.remove(&head.cycle_id);
                    journal.push(&head.cycle_id, AuditAction::Dequeue, Some(shelf), now);
                    continue;
                }
                Err(SchedulerError::CycleNotFound(_)) => {
                    tracing::error!(cycle_id = %head.cycle_id, shelf = %shelf, "dropping queue entry of unknown cycle");
                    self.queue.remove(&head.cycle_id);
                    continue;
                }
                Err(err) => return Err(err),
            };

            self.bind(&cycle, std::slice::from_ref(shelf), head.will_start_from, now)?;
            self.queue.remove(&head.cycle_id);
            tracing::info!(cycle_id = %head.cycle_id, shelf = %shelf, "queued cycle promoted");
            journal.push(&head.cycle_id, AuditAction::Promote, Some(shelf), now);
            return Ok(Some(head.cycle_id));
        }

        tracing::debug!(shelf = %shelf, "no cycles waiting; shelf stays free");
        Ok(None)
    }

    fn free_shelf(
        &mut self,
        shelf: &ShelfRef,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Option<CycleId>, SchedulerError> {
        let previous = match self.registry.mark_free(shelf) {
            Ok(previous) => previous,
            Err(SchedulerError::NotOccupied(_)) => {
                tracing::debug!(shelf = %shelf, "shelf already free");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let Some(occupant) = previous.occupant_cycle_id else {
            return Ok(None);
        };
        match self.cycles.detach_shelf(&occupant, shelf, now) {
            Ok(_) => {}
            Err(SchedulerError::CycleNotFound(_)) => {
                tracing::warn!(cycle_id = %occupant, shelf = %shelf, "freed shelf held by unknown cycle");
            }
            Err(err) => {
                let until = previous.occupied_until.unwrap_or(now);
                if let Err(undo) = self.registry.mark_occupied(shelf, &occupant, until) {
                    tracing::error!(shelf = %shelf, error = %undo, "failed to restore occupancy");
                }
                return Err(err);
            }
        }
        tracing::info!(cycle_id = %occupant, shelf = %shelf, "shelf released");
        journal.push(&occupant, AuditAction::Release, Some(shelf), now);
        Ok(Some(occupant))
    }

    fn release(
        &mut self,
        cycle_id: &CycleId,
        shelf: &ShelfRef,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<ReleaseOutcome, SchedulerError> {
        self.cycles.get(cycle_id)?;
        if !self.registry.get(shelf)?.is_held_by(cycle_id) {
            tracing::debug!(cycle_id = %cycle_id, shelf = %shelf, "release ignored; shelf not held by cycle");
            return Ok(ReleaseOutcome::default());
        }
        self.free_shelf(shelf, now, journal)?;
        let promoted = self.promote(shelf, now, journal)?;
        Ok(ReleaseOutcome {
            freed: true,
            promoted,
        })
    }

    fn cancel(
        &mut self,
        cycle_id: &CycleId,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Vec<CycleId>, SchedulerError> {
        let cycle = self.cycles.get(cycle_id)?;
        if !cycle.status.can_transition_to(CycleStatus::Cancelled) {
            tracing::error!(cycle_id = %cycle_id, status = %cycle.status, "cancel of finished cycle");
            return Err(SchedulerError::InvalidTransition {
                cycle: cycle_id.clone(),
                from: cycle.status,
                to: CycleStatus::Cancelled,
            });
        }
        let freed = self.retire(&cycle, CycleStatus::Cancelled, now, journal)?;
        if let Some(entry) = self.queue.remove(cycle_id) {
            journal.push(cycle_id, AuditAction::Dequeue, Some(&entry.target_shelf), now);
        }
        tracing::info!(cycle_id = %cycle_id, freed = freed.len(), "cycle cancelled");
        journal.push(cycle_id, AuditAction::Cancel, None, now);
        self.promote_all(&freed, now, journal)
    }

    fn harvest(
        &mut self,
        cycle_id: &CycleId,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Vec<CycleId>, SchedulerError> {
        let cycle = self.cycles.get(cycle_id)?;
        let freed = self.retire(&cycle, CycleStatus::Harvested, now, journal)?;
        tracing::info!(cycle_id = %cycle_id, freed = freed.len(), "cycle harvested");
        journal.push(cycle_id, AuditAction::Harvest, None, now);
        self.promote_all(&freed, now, journal)
    }

    /// Move a cycle to a terminal status and free every shelf it holds.
    fn retire(
        &mut self,
        cycle: &CropCycle,
        terminal: CycleStatus,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Vec<ShelfRef>, SchedulerError> {
        let id = &cycle.cycle_id;
        // Advance first: a rejected transition leaves every shelf untouched.
        let mut retired = self.cycles.advance(id, terminal, now)?;
        let held = std::mem::take(&mut retired.shelves);
        retired.preferred_target = None;
        if let Err(err) = self.cycles.update(retired) {
            self.restore_cycle(cycle);
            return Err(err);
        }

        let mut freed = Vec::with_capacity(held.len());
        for shelf in held {
            if !self.registry.get(&shelf)?.is_held_by(id) {
                tracing::warn!(cycle_id = %id, shelf = %shelf, "cycle listed a shelf it does not hold");
                continue;
            }
            self.registry.mark_free(&shelf)?;
            journal.push(id, AuditAction::Release, Some(&shelf), now);
            freed.push(shelf);
        }
        Ok(freed)
    }

    fn promote_all(
        &mut self,
        shelves: &[ShelfRef],
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Vec<CycleId>, SchedulerError> {
        let mut promoted = Vec::new();
        for shelf in shelves {
            if let Some(id) = self.promote(shelf, now, journal)? {
                promoted.push(id);
            }
        }
        Ok(promoted)
    }

    fn prune_expired(
        &mut self,
        policy: &QueuePolicy,
        now: DateTime<Utc>,
        journal: &mut Journal,
    ) -> Result<Vec<CycleId>, SchedulerError> {
        let Some(timeout) = policy.entry_timeout() else {
            return Ok(Vec::new());
        };
        let timeout =
            chrono::Duration::from_std(timeout).map_err(|e| SchedulerError::Backend(e.to_string()))?;
        let cutoff = now - timeout;

        let mut expired = Vec::new();
        for entry in self.queue.queued_before(cutoff) {
            self.queue.remove(&entry.cycle_id);
            match self.cycles.get(&entry.cycle_id) {
                Ok(cycle) if cycle.status.can_transition_to(CycleStatus::Cancelled) => {
                    let mut cancelled = self.cycles.advance(&entry.cycle_id, CycleStatus::Cancelled, now)?;
                    cancelled.preferred_target = None;
                    self.cycles.update(cancelled)?;
                }
                Ok(_) | Err(SchedulerError::CycleNotFound(_)) => {}
                Err(err) => return Err(err),
            }
            tracing::warn!(cycle_id = %entry.cycle_id, shelf = %entry.target_shelf, queued_at = %entry.queued_at, "queued cycle expired");
            journal.push(&entry.cycle_id, AuditAction::Expire, Some(&entry.target_shelf), now);
            expired.push(entry.cycle_id);
        }
        Ok(expired)
    }

    /// Bind `shelves` to `cycle` and advance it to `resume_at`.
    ///
    /// On any failure the shelves marked so far are freed and the cycle
    /// record is put back, so the caller sees either the whole bind or none of it.
    fn bind(
        &mut self,
        cycle: &CropCycle,
        shelves: &[ShelfRef],
        resume_at: CycleStatus,
        now: DateTime<Utc>,
    ) -> Result<CropCycle, SchedulerError> {
        let until = cycle.release_estimate(now)?;
        let mut marked: Vec<ShelfRef> = Vec::with_capacity(shelves.len());
        for shelf in shelves {
            if let Err(err) = self.registry.mark_occupied(shelf, &cycle.cycle_id, until) {
                tracing::warn!(cycle_id = %cycle.cycle_id, shelf = %shelf, error = %err, "bind lost shelf");
                self.unmark(&marked);
                return Err(err);
            }
            marked.push(shelf.clone());
        }

        match self.bind_record(&cycle.cycle_id, shelves, resume_at, now) {
            Ok(bound) => Ok(bound),
            Err(err) => {
                self.unmark(&marked);
                self.restore_cycle(cycle);
                Err(err)
            }
        }
    }

    fn bind_record(
        &mut self,
        id: &CycleId,
        shelves: &[ShelfRef],
        resume_at: CycleStatus,
        now: DateTime<Utc>,
    ) -> Result<CropCycle, SchedulerError> {
        self.cycles.bind_shelves(id, shelves.to_vec(), now)?;
        let bound = self.cycles.advance(id, CycleStatus::Transplant, now)?;
        if resume_at == CycleStatus::Transplant || !CycleStatus::Transplant.can_transition_to(resume_at) {
            return Ok(bound);
        }
        self.cycles.advance(id, resume_at, now)
    }

    fn unmark(&mut self, shelves: &[ShelfRef]) {
        for shelf in shelves {
            if let Err(err) = self.registry.mark_free(shelf) {
                tracing::error!(shelf = %shelf, error = %err, "failed to roll back shelf occupancy");
            }
        }
    }

    fn restore_cycle(&mut self, original: &CropCycle) {
        if let Err(err) = self.cycles.update(original.clone()) {
            tracing::error!(cycle_id = %original.cycle_id, error = %err, "failed to roll back cycle record");
        }
    }
}

fn single(shelves: &[ShelfRef]) -> Option<&ShelfRef> {
    match shelves {
        [only] => Some(only),
        _ => None,
    }
}
