//! Tests for builder modules

use rack_scheduler::builders::{build_directory, build_memory_directory};
use rack_scheduler::config::{FarmLayout, QueuePolicy, SchedulerConfig};
use rack_scheduler::core::SchedulerError;
use rack_scheduler::infra::{memory_farm, MemoryDirectory};
use rack_scheduler::util::serde::FarmId;

fn two_farms() -> SchedulerConfig {
    SchedulerConfig {
        farms: vec![FarmLayout::uniform("north", 2, 3), FarmLayout::uniform("south", 1, 1)],
        queue: QueuePolicy {
            max_depth_per_shelf: 4,
            ..QueuePolicy::default()
        },
    }
}

#[test]
fn test_build_memory_directory() {
    let directory = build_memory_directory(&two_farms()).unwrap();
    assert_eq!(directory.len(), 2);

    let north = directory.get(&FarmId::new("north")).unwrap();
    assert_eq!(north.allocation_view().total_shelves, 6);
    assert_eq!(north.policy().max_depth_per_shelf, 4);

    let ids: Vec<_> = directory
        .farms()
        .iter()
        .map(|f| f.farm_id().as_str().to_owned())
        .collect();
    assert_eq!(ids, vec!["north", "south"]);
    assert!(matches!(
        directory.get(&FarmId::new("east")),
        Err(SchedulerError::FarmNotFound(_))
    ));
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        farms: Vec::new(),
        queue: QueuePolicy::default(),
    };
    assert!(matches!(
        build_memory_directory(&cfg),
        Err(SchedulerError::InvalidLayout(_))
    ));
}

#[test]
fn test_factory_errors_propagate() {
    let result: Result<MemoryDirectory, _> = build_directory(&two_farms(), |layout, _| {
        Err(SchedulerError::Backend(format!("no storage for {}", layout.farm_id)))
    });
    assert!(matches!(result, Err(SchedulerError::Backend(_))));
}

#[test]
fn test_factory_must_build_requested_farm() {
    let result: Result<MemoryDirectory, _> = build_directory(&two_farms(), |_, policy| {
        memory_farm(&FarmLayout::uniform("elsewhere", 1, 1), policy.clone())
    });
    assert!(matches!(result, Err(SchedulerError::InvalidLayout(_))));
}
