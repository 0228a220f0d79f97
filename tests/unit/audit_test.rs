//! Tests for audit sink

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rack_scheduler::config::{FarmLayout, QueuePolicy};
use rack_scheduler::core::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, CycleSpec, CycleStatus,
    InMemoryAuditSink,
};
use rack_scheduler::infra::memory_farm;
use rack_scheduler::util::serde::{CycleId, FarmId, ShelfRef};

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<AuditEvent>>>);

impl AuditSink for SharedSink {
    fn record(&mut self, event: AuditEvent) {
        self.0.lock().push(event);
    }
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let event = build_audit_event(
        &FarmId::new("farm-1"),
        &CycleId::new("C1"),
        AuditAction::Allocate,
        Some(&ShelfRef::new("R1", "S1")),
        at,
    );

    sink.record(event.clone());
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], event);
    assert_eq!(events[0].shelf, Some(ShelfRef::new("R1", "S1")));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let farm = FarmId::new("farm-1");
    for id in ["C1", "C2", "C3"] {
        sink.record(build_audit_event(&farm, &CycleId::new(id), AuditAction::Create, None, at));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].cycle_id.as_str(), "C2"); // First one popped
    assert_eq!(events[1].cycle_id.as_str(), "C3");
}

#[test]
fn test_event_ids_are_unique() {
    let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let a = build_audit_event(&FarmId::new("f"), &CycleId::new("C1"), AuditAction::Release, None, at);
    let b = build_audit_event(&FarmId::new("f"), &CycleId::new("C1"), AuditAction::Release, None, at);
    assert_ne!(a.event_id, b.event_id);
}

#[test]
fn test_farm_records_queue_lifecycle() {
    let sink = SharedSink::default();
    let farm = memory_farm(&FarmLayout::uniform("farm-1", 1, 1), QueuePolicy::default())
        .unwrap()
        .with_audit(Box::new(sink.clone()));
    let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
    for id in ["C1", "C2"] {
        farm.create_cycle(CycleSpec::new("Basil", 1, 14).with_id(id), now)
            .unwrap();
        farm.place(&CycleId::new(id), now).unwrap();
    }
    farm.advance_stage(&CycleId::new("C1"), CycleStatus::Growing, now)
        .unwrap();
    farm.harvest(&CycleId::new("C1"), now).unwrap();

    let actions: Vec<_> = sink
        .0
        .lock()
        .iter()
        .map(|e| (e.cycle_id.as_str().to_owned(), e.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            ("C1".to_owned(), AuditAction::Create),
            ("C1".to_owned(), AuditAction::Allocate),
            ("C2".to_owned(), AuditAction::Create),
            ("C2".to_owned(), AuditAction::Enqueue),
            ("C1".to_owned(), AuditAction::Release),
            ("C1".to_owned(), AuditAction::Harvest),
            ("C2".to_owned(), AuditAction::Promote),
        ]
    );
    assert!(sink.0.lock().iter().all(|e| e.farm_id.as_str() == "farm-1"));
}

#[test]
fn test_rejected_plant_records_nothing() {
    let sink = SharedSink::default();
    let farm = memory_farm(&FarmLayout::uniform("farm-1", 1, 1), QueuePolicy::default())
        .unwrap()
        .with_audit(Box::new(sink.clone()));
    let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

    let spec = CycleSpec::new("Basil", 1, 14)
        .with_id("P")
        .with_preferred_target(ShelfRef::new("R9", "S9"));
    assert!(farm.plant(spec, now).is_err());
    assert!(sink.0.lock().is_empty());

    let (cycle, _) = farm.plant(CycleSpec::new("Basil", 1, 14).with_id("P"), now).unwrap();
    assert_eq!(cycle.cycle_id, CycleId::new("P"));
    let actions: Vec<_> = sink.0.lock().iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::Create, AuditAction::Allocate]);
}
