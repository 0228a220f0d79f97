//! Randomized operation sequences checked against the occupancy and queue invariants.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rack_scheduler::config::{FarmLayout, QueuePolicy};
use rack_scheduler::core::{CycleSpec, CycleStatus, CycleStore, QueueStore, ShelfRegistry};
use rack_scheduler::infra::{memory_farm, MemoryFarm};
use rack_scheduler::util::serde::{CycleId, ShelfRef};

const CYCLES: usize = 12;

fn check_invariants(farm: &MemoryFarm) {
    farm.read(|state| {
        let mut bound = HashSet::new();
        for shelf in state.registry.list() {
            match &shelf.occupant_cycle_id {
                Some(occupant) => {
                    let cycle = state.cycles.get(occupant).unwrap();
                    assert!(!cycle.status.is_terminal(), "{occupant} is finished but holds {}", shelf.location);
                    assert!(cycle.shelves.contains(&shelf.location));
                }
                None => assert_eq!(
                    state.queue.depth(&shelf.location),
                    0,
                    "free shelf {} has waiters",
                    shelf.location
                ),
            }
        }
        for cycle in state.cycles.list() {
            for shelf in &cycle.shelves {
                assert!(bound.insert(shelf.clone()), "{shelf} bound twice");
                assert!(state.registry.get(shelf).unwrap().is_held_by(&cycle.cycle_id));
            }
        }

        let mut by_shelf: BTreeMap<ShelfRef, Vec<usize>> = BTreeMap::new();
        for entry in state.queue.all() {
            let cycle = state.cycles.get(&entry.cycle_id).unwrap();
            assert_eq!(cycle.status, CycleStatus::Queued);
            assert!(cycle.shelves.is_empty());
            by_shelf
                .entry(entry.target_shelf.clone())
                .or_default()
                .push(state.queue.position(&entry.cycle_id).unwrap());
        }
        for positions in by_shelf.values() {
            assert_eq!(*positions, (1..=positions.len()).collect::<Vec<_>>());
        }
    });
}

fn run(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let farm = memory_farm(&FarmLayout::uniform("farm-r", 2, 2), QueuePolicy::default()).unwrap();
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let shelves: Vec<ShelfRef> = FarmLayout::uniform("farm-r", 2, 2).shelf_refs().collect();

    for i in 0..CYCLES {
        let count = if rng.random_bool(0.2) { 2 } else { 1 };
        farm.create_cycle(
            CycleSpec::new("Lettuce", count, rng.random_range(5..40)).with_id(format!("C{i}")),
            start,
        )
        .unwrap();
    }

    for step in 0..steps {
        let now = start + Duration::hours(i64::try_from(step).unwrap());
        let cycle = CycleId::new(format!("C{}", rng.random_range(0..CYCLES)));
        let shelf = &shelves[rng.random_range(0..shelves.len())];
        match rng.random_range(0..7) {
            0 => {
                let _ = farm.place(&cycle, now);
            }
            1 => {
                let _ = farm.enqueue(&cycle, shelf, now);
            }
            2 => {
                let _ = farm.release(&cycle, shelf, now);
            }
            3 => {
                let _ = farm.cancel(&cycle, now);
            }
            4 => {
                let _ = farm.advance_stage(&cycle, CycleStatus::Growing, now);
                let _ = farm.harvest(&cycle, now);
            }
            5 => {
                let _ = farm.dequeue(&cycle, now);
            }
            _ => {
                let _ = farm.on_shelf_freed(shelf, now);
            }
        }
        check_invariants(&farm);
    }
}

#[test]
fn test_random_sequences_hold_invariants() {
    for seed in 0..32 {
        run(seed, 200);
    }
}
