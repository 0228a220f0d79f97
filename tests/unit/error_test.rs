//! Tests for error types

use rack_scheduler::core::{CycleStatus, ErrorClass, SchedulerError};
use rack_scheduler::util::serde::{CycleId, FarmId, ShelfRef};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull(ShelfRef::new("R1", "S2"));
    assert_eq!(format!("{err}"), "queue full for shelf R1-S2");
    assert_eq!(err.class(), ErrorClass::Contention);
    assert!(err.is_retryable());
}

#[test]
fn test_already_occupied_error() {
    let err = SchedulerError::AlreadyOccupied {
        shelf: ShelfRef::new("R1", "S1"),
        occupant: CycleId::new("C1"),
    };
    assert_eq!(format!("{err}"), "shelf R1-S1 already occupied by C1");
    assert!(err.is_retryable());
}

#[test]
fn test_invalid_transition_error() {
    let err = SchedulerError::InvalidTransition {
        cycle: CycleId::new("C9"),
        from: CycleStatus::Queued,
        to: CycleStatus::Growing,
    };
    assert_eq!(
        format!("{err}"),
        "invalid transition for cycle C9: QUEUED -> GROWING"
    );
    assert_eq!(err.class(), ErrorClass::InvariantViolation);
    assert!(!err.is_retryable());
}

#[test]
fn test_not_found_errors() {
    let err = SchedulerError::FarmNotFound(FarmId::new("nowhere"));
    assert_eq!(format!("{err}"), "farm not found: nowhere");
    assert_eq!(err.class(), ErrorClass::NotFound);
    assert_eq!(
        SchedulerError::CycleNotFound(CycleId::new("C1")).class(),
        ErrorClass::NotFound
    );
}

#[test]
fn test_backend_error() {
    let err = SchedulerError::Backend("connection failed".to_string());
    assert_eq!(format!("{err}"), "backend error: connection failed");
    assert_eq!(err.class(), ErrorClass::Backend);
}
