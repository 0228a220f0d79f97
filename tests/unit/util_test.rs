//! Tests for utility functions

use chrono::{Duration, TimeZone, Utc};
use rack_scheduler::util::{days_until, init_tracing, CycleId, FarmId, ShelfRef};

#[test]
fn test_shelf_ordering() {
    let mut shelves = vec![
        ShelfRef::new("R2", "S1"),
        ShelfRef::new("R1", "S2"),
        ShelfRef::new("R1", "S1"),
    ];
    shelves.sort();
    assert_eq!(
        shelves,
        vec![
            ShelfRef::new("R1", "S1"),
            ShelfRef::new("R1", "S2"),
            ShelfRef::new("R2", "S1"),
        ]
    );
    assert_eq!(ShelfRef::new("R3", "S7").to_string(), "R3-S7");
}

#[test]
fn test_ids_serialize_transparently() {
    assert_eq!(serde_json::to_string(&FarmId::new("north")).unwrap(), "\"north\"");
    let id: CycleId = serde_json::from_str("\"C42\"").unwrap();
    assert_eq!(id.as_str(), "C42");
    assert_ne!(CycleId::generate(), CycleId::generate());
}

#[test]
fn test_days_until_rounds_up() {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    assert_eq!(days_until(now + Duration::hours(1), now), 1);
    assert_eq!(days_until(now + Duration::days(2), now), 2);
    assert_eq!(days_until(now - Duration::days(2), now), 0);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
