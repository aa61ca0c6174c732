//! Claw spawn engine.

use arcade_types::ClawMachine;
use std::collections::HashMap;

use crate::sampler::{Sampler, WeightedEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnCandidate {
    pub id: i64,
    pub spawn_percent: i64,
    pub max_per_round: i64,
}

/// Draws up to `max_output` ids, never picking an id more than its `max_per_round`.
///
/// Stops early once every candidate is capped or the remaining weight is zero.
pub fn spawn_with_controls(
    sampler: &Sampler,
    candidates: &[SpawnCandidate],
    max_output: usize,
) -> Vec<i64> {
    let mut output = Vec::with_capacity(max_output.min(candidates.len() * 4));
    let mut counts: HashMap<i64, i64> = HashMap::new();

    while output.len() < max_output {
        let eligible: Vec<WeightedEntry> = candidates
            .iter()
            .filter(|c| counts.get(&c.id).copied().unwrap_or_default() < c.max_per_round)
            .map(|c| WeightedEntry::new(c.id, c.spawn_percent))
            .collect();
        let total: i64 = eligible.iter().map(|e| e.weight.max(0)).sum();
        if total == 0 {
            break;
        }

        let id = sampler.pick_weighted(&eligible);
        *counts.entry(id).or_default() += 1;
        output.push(id);
    }
    output
}

/// Spawn list for a claw machine, capped by the machine's `max_item`.
pub fn spawn_for_machine(sampler: &Sampler, machine: &ClawMachine) -> Vec<i64> {
    let candidates: Vec<SpawnCandidate> = machine
        .items
        .iter()
        .map(|slot| SpawnCandidate {
            id: slot.item.id,
            spawn_percent: slot.item.spawn_percentage,
            max_per_round: slot.item.max_item_spawned,
        })
        .collect();
    spawn_with_controls(sampler, &candidates, machine.max_item.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: i64, spawn_percent: i64, max_per_round: i64) -> SpawnCandidate {
        SpawnCandidate {
            id,
            spawn_percent,
            max_per_round,
        }
    }

    #[test]
    fn zero_output_cap_yields_nothing() {
        let sampler = Sampler::seeded(1);
        assert!(spawn_with_controls(&sampler, &[candidate(1, 50, 3)], 0).is_empty());
    }

    #[test]
    fn empty_candidates_yield_nothing() {
        let sampler = Sampler::seeded(1);
        assert!(spawn_with_controls(&sampler, &[], 10).is_empty());
    }

    #[test]
    fn stops_when_every_item_is_capped() {
        let sampler = Sampler::seeded(2);
        let spawned =
            spawn_with_controls(&sampler, &[candidate(1, 50, 2), candidate(2, 50, 1)], 10);
        assert_eq!(spawned.len(), 3);
        assert_eq!(spawned.iter().filter(|id| **id == 1).count(), 2);
        assert_eq!(spawned.iter().filter(|id| **id == 2).count(), 1);
    }

    #[test]
    fn zero_weight_items_never_spawn() {
        let sampler = Sampler::seeded(3);
        let spawned =
            spawn_with_controls(&sampler, &[candidate(1, 0, 5), candidate(2, 10, 2)], 10);
        assert_eq!(spawned, vec![2, 2]);
    }

    #[test]
    fn machine_cap_applies() {
        let sampler = Sampler::seeded(4);
        let machine = crate::mocks::claw_machine();
        let spawned = spawn_for_machine(&sampler, &machine);
        assert!(spawned.len() <= machine.max_item as usize);
        assert!(!spawned.is_empty());
    }

    proptest! {
        #[test]
        fn respects_output_and_per_item_caps(
            seed in any::<u64>(),
            items in prop::collection::vec((0i64..120, 0i64..5), 0..8),
            max_output in 0usize..30,
        ) {
            let sampler = Sampler::seeded(seed);
            let candidates: Vec<_> = items
                .iter()
                .enumerate()
                .map(|(i, (weight, cap))| candidate(i as i64 + 1, *weight, *cap))
                .collect();
            let spawned = spawn_with_controls(&sampler, &candidates, max_output);

            prop_assert!(spawned.len() <= max_output);
            for c in &candidates {
                let count = spawned.iter().filter(|id| **id == c.id).count() as i64;
                prop_assert!(count <= c.max_per_round);
                if c.spawn_percent == 0 {
                    prop_assert_eq!(count, 0);
                }
            }
        }
    }
}
