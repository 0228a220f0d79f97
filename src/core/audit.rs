//! Audit sink implementations.
//!
//! Every binding, queue change, and release in a farm produces one event.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::serde::{CycleId, FarmId, ShelfRef};

/// Action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Cycle created.
    Create,
    /// Cycle bound directly by the allocator.
    Allocate,
    /// Cycle placed in a shelf queue.
    Enqueue,
    /// Queue head bound to a freed shelf.
    Promote,
    /// Shelf released by its occupant.
    Release,
    /// Queue entry removed without promotion.
    Dequeue,
    /// Cycle cancelled.
    Cancel,
    /// Cycle harvested.
    Harvest,
    /// Queued cycle cancelled after its wait timed out.
    Expire,
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Farm the event happened in.
    pub farm_id: FarmId,
    /// Related cycle.
    pub cycle_id: CycleId,
    /// Action taken.
    pub action: AuditAction,
    /// Shelf involved, when there is exactly one.
    pub shelf: Option<ShelfRef>,
    /// Time of the action.
    pub created_at: DateTime<Utc>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event with a fresh identifier.
pub fn build_audit_event(
    farm_id: &FarmId,
    cycle_id: &CycleId,
    action: AuditAction,
    shelf: Option<&ShelfRef>,
    created_at: DateTime<Utc>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        farm_id: farm_id.clone(),
        cycle_id: cycle_id.clone(),
        action,
        shelf: shelf.cloned(),
        created_at,
    }
}
