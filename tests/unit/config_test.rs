//! Tests for configuration validation

use std::io::Write;

use rack_scheduler::config::{FarmLayout, QueuePolicy, RackLayout, SchedulerConfig};
use rack_scheduler::core::CycleStatus;

const VALID: &str = r#"{
    "farms": [
        {
            "farm_id": "north",
            "racks": [
                { "rack_id": "R1", "shelves": ["S1", "S2"] },
                { "rack_id": "R2", "shelves": ["S1"] }
            ]
        }
    ],
    "queue": { "max_depth_per_shelf": 8, "entry_timeout_secs": 86400 }
}"#;

#[test]
fn test_parse_valid_config() {
    let cfg = SchedulerConfig::from_json_str(VALID).unwrap();
    assert_eq!(cfg.farms.len(), 1);
    assert_eq!(cfg.farms[0].shelf_refs().count(), 3);
    assert_eq!(cfg.queue.max_depth_per_shelf, 8);
    assert_eq!(cfg.queue.entry_timeout_secs, Some(86400));
    assert_eq!(cfg.queue.will_start_from, CycleStatus::Transplant);
}

#[test]
fn test_queue_policy_defaults_when_omitted() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{ "farms": [ { "farm_id": "f", "racks": [ { "rack_id": "R1", "shelves": ["S1"] } ] } ] }"#,
    )
    .unwrap();
    assert_eq!(cfg.queue.max_depth_per_shelf, QueuePolicy::default().max_depth_per_shelf);
    assert!(cfg.queue.entry_timeout().is_none());
}

#[test]
fn test_scheduler_config_requires_farms() {
    let err = SchedulerConfig::from_json_str(r#"{ "farms": [] }"#).unwrap_err();
    assert!(err.contains("at least one farm"));
    assert!(SchedulerConfig::from_json_str("not json").unwrap_err().contains("parse error"));
}

#[test]
fn test_duplicate_farm_rejected() {
    let cfg = SchedulerConfig {
        farms: vec![FarmLayout::uniform("a", 1, 1), FarmLayout::uniform("a", 2, 2)],
        queue: QueuePolicy::default(),
    };
    assert!(cfg.validate().unwrap_err().contains("duplicate farm"));
}

#[test]
fn test_layout_validation() {
    assert!(FarmLayout::uniform("f", 2, 3).validate().is_ok());
    assert!(FarmLayout::uniform("", 1, 1).validate().is_err());
    assert!(FarmLayout::uniform("f", 0, 1).validate().is_err());
    assert!(FarmLayout::uniform("f", 1, 0).validate().is_err());

    let duplicate_rack = FarmLayout {
        farm_id: "f".into(),
        racks: vec![
            RackLayout {
                rack_id: "R1".into(),
                shelves: vec!["S1".into()],
            },
            RackLayout {
                rack_id: "R1".into(),
                shelves: vec!["S2".into()],
            },
        ],
    };
    assert!(duplicate_rack.validate().unwrap_err().contains("duplicate rack"));

    let duplicate_shelf = FarmLayout {
        farm_id: "f".into(),
        racks: vec![RackLayout {
            rack_id: "R1".into(),
            shelves: vec!["S1".into(), "S1".into()],
        }],
    };
    assert!(duplicate_shelf.validate().unwrap_err().contains("duplicate shelf"));
}

#[test]
fn test_queue_policy_validation() {
    assert!(QueuePolicy::default().validate().is_ok());
    let zero_depth = QueuePolicy {
        max_depth_per_shelf: 0,
        ..QueuePolicy::default()
    };
    assert!(zero_depth.validate().is_err());
    let zero_timeout = QueuePolicy {
        entry_timeout_secs: Some(0),
        ..QueuePolicy::default()
    };
    assert!(zero_timeout.validate().is_err());
    let bad_resume = QueuePolicy {
        will_start_from: CycleStatus::Harvested,
        ..QueuePolicy::default()
    };
    assert!(bad_resume.validate().unwrap_err().contains("will_start_from"));
    let growing = QueuePolicy {
        will_start_from: CycleStatus::Growing,
        ..QueuePolicy::default()
    };
    assert!(growing.validate().is_ok());
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VALID.as_bytes()).unwrap();
    let cfg = SchedulerConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.farms[0].farm_id.as_str(), "north");

    let missing = SchedulerConfig::from_file("/nonexistent/rack-scheduler.json").unwrap_err();
    assert!(format!("{missing:#}").contains("reading config"));
}
