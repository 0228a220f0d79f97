//! Tests for the API surface

use chrono::{Duration, TimeZone, Utc};
use rack_scheduler::builders::build_memory_directory;
use rack_scheduler::config::{FarmLayout, QueuePolicy, SchedulerConfig};
use rack_scheduler::core::{CycleSpec, ErrorClass, Placement};
use rack_scheduler::infra::MemoryDirectory;
use rack_scheduler::runtime::{
    allocation_snapshot, cancel, harvest, health, pending_cycles, plant, release, PlantRequest,
};
use rack_scheduler::util::serde::{CycleId, FarmId, ShelfRef};

fn directory() -> MemoryDirectory {
    build_memory_directory(&SchedulerConfig {
        farms: vec![FarmLayout::uniform("farm-1", 1, 1)],
        queue: QueuePolicy::default(),
    })
    .unwrap()
}

fn request(id: &str) -> PlantRequest {
    PlantRequest {
        farm_id: FarmId::new("farm-1"),
        spec: CycleSpec::new("Arugula", 1, 10)
            .with_id(id)
            .with_variety("Wild", "leafy"),
    }
}

#[test]
fn test_plant_binds_then_queues() {
    let dir = directory();
    let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();

    let first = plant(&dir, request("C1"), now).unwrap();
    assert_eq!(
        first.placement,
        Placement::Bound {
            shelves: vec![ShelfRef::new("R1", "S1")]
        }
    );
    let second = plant(&dir, request("C2"), now).unwrap();
    assert_eq!(second.cycle_id, CycleId::new("C2"));
    assert!(matches!(
        second.placement,
        Placement::Queued {
            queue_position: 1,
            ..
        }
    ));

    let farm_id = FarmId::new("farm-1");
    let pending = pending_cycles(&dir, &farm_id, now + Duration::days(4)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].crop_variety, "Wild");
    assert_eq!(pending[0].waiting_for_shelf.current_crop, "Arugula");
    assert_eq!(pending[0].waiting_for_shelf.days_until_available, 6);

    let snapshot = allocation_snapshot(&dir, &farm_id).unwrap();
    assert_eq!(snapshot.total_shelves, 1);
    assert_eq!(snapshot.occupied_shelves, 1);

    let outcome = release(&dir, &farm_id, &CycleId::new("C1"), &ShelfRef::new("R1", "S1"), now)
        .unwrap();
    assert_eq!(outcome.promoted, Some(CycleId::new("C2")));
    assert!(pending_cycles(&dir, &farm_id, now).unwrap().is_empty());

    assert!(cancel(&dir, &farm_id, &CycleId::new("C1"), now).unwrap().is_empty());
    let err = harvest(&dir, &farm_id, &CycleId::new("C2"), now).unwrap_err();
    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert!(!err.retryable);
}

#[test]
fn test_rejected_plant_leaves_no_cycle() {
    let dir = directory();
    let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    let farm_id = FarmId::new("farm-1");

    let mut bad = request("P");
    bad.spec = bad.spec.with_preferred_target(ShelfRef::new("R9", "S9"));
    let err = plant(&dir, bad, now).unwrap_err();
    assert_eq!(err.class, ErrorClass::NotFound);
    assert_eq!(err.message, "shelf not found: R9-S9");

    let snapshot = allocation_snapshot(&dir, &farm_id).unwrap();
    assert!(snapshot.crop_cycles.is_empty());
    let farm = dir.get(&farm_id).unwrap();
    assert!(farm.cycle(&CycleId::new("P")).is_err());

    let retry = plant(&dir, request("P"), now).unwrap();
    assert_eq!(retry.cycle_id, CycleId::new("P"));
    assert!(matches!(retry.placement, Placement::Bound { .. }));
}

#[test]
fn test_unknown_farm_maps_to_not_found() {
    let dir = directory();
    let err = allocation_snapshot(&dir, &FarmId::new("missing")).unwrap_err();
    assert_eq!(err.class, ErrorClass::NotFound);
    assert_eq!(err.message, "farm not found: missing");
}

#[test]
fn test_snapshot_serializes_with_camel_case_keys() {
    let dir = directory();
    let now = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    plant(&dir, request("C1"), now).unwrap();
    let json = serde_json::to_value(allocation_snapshot(&dir, &FarmId::new("farm-1")).unwrap())
        .unwrap();
    assert_eq!(json["totalShelves"], 1);
    assert_eq!(json["occupiedShelves"], 1);
    assert_eq!(json["cropcycles"][0]["status"], "TRANSPLANT");
}

#[test]
fn test_plant_request_from_json() {
    let req: PlantRequest = serde_json::from_str(
        r#"{
            "farm_id": "farm-1",
            "crop_name": "Basil",
            "requested_shelf_count": 1,
            "growing_days": 21,
            "preferred_target": { "rack_id": "R1", "shelf_id": "S1" }
        }"#,
    )
    .unwrap();
    assert_eq!(req.spec.preferred_target, Some(ShelfRef::new("R1", "S1")));
    let placed = plant(&directory(), req, Utc::now()).unwrap();
    assert!(matches!(placed.placement, Placement::Bound { .. }));
}

#[test]
fn test_health_reports_farms() {
    let report = health(&directory());
    assert!(report.ok);
    assert_eq!(report.farms, 1);
}
