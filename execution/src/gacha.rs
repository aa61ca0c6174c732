//! Gacha pull engine and pity transition.

use arcade_types::{GachaMachine, GachaPityState, Item, Rarity};
use tracing::debug;

use crate::{
    error::EngineError,
    sampler::{Sampler, WeightedEntry, NO_PICK},
};

/// Item pool a sub-pull draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    UltraRare,
    SuperRare,
    All,
}

impl Bucket {
    fn rarity(&self) -> Option<Rarity> {
        match self {
            Bucket::UltraRare => Some(Rarity::UltraRare),
            Bucket::SuperRare => Some(Rarity::SuperRare),
            Bucket::All => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullOutcome {
    pub item_id: i64,
    pub rarity: Rarity,
    /// Bucket selected by the pity counters.
    pub bucket: Bucket,
    /// The selected bucket was empty and the pull drew from every item instead.
    pub fell_back: bool,
    /// Counters after this pull.
    pub pity: GachaPityState,
}

/// Ultra pity is checked before super pity.
pub fn bucket_for(machine: &GachaMachine, pity: &GachaPityState) -> Bucket {
    if pity.ultra_rare_pity_count >= machine.ultra_rare_pity {
        Bucket::UltraRare
    } else if pity.super_rare_pity_count >= machine.super_rare_pity {
        Bucket::SuperRare
    } else {
        Bucket::All
    }
}

/// Applies the counter transition for a pulled rarity.
pub fn advance_pity(pity: &GachaPityState, pulled: Rarity) -> GachaPityState {
    let mut next = *pity;
    match pulled {
        Rarity::UltraRare => {
            next.ultra_rare_pity_count = 0;
            next.super_rare_pity_count += 1;
        }
        Rarity::SuperRare => {
            next.super_rare_pity_count = 0;
            next.ultra_rare_pity_count += 1;
        }
        _ => {
            next.super_rare_pity_count += 1;
            next.ultra_rare_pity_count += 1;
        }
    }
    next
}

fn entries(machine: &GachaMachine, rarity: Option<Rarity>) -> Vec<WeightedEntry> {
    let weighted = |item: &Item| WeightedEntry::new(item.id, i64::from(item.pull_weight));
    match rarity {
        Some(rarity) => machine.items_of(rarity).map(weighted).collect(),
        None => machine.items.iter().map(|slot| weighted(&slot.item)).collect(),
    }
}

/// Resolves one sub-pull.
pub fn pull_once(
    sampler: &Sampler,
    machine: &GachaMachine,
    pity: &GachaPityState,
) -> Result<PullOutcome, EngineError> {
    let bucket = bucket_for(machine, pity);
    let mut fell_back = false;
    let mut item_id = sampler.pick_weighted(&entries(machine, bucket.rarity()));
    if item_id == NO_PICK && bucket != Bucket::All {
        debug!(machine_id = machine.id, ?bucket, "forced bucket is empty");
        fell_back = true;
        item_id = sampler.pick_weighted(&entries(machine, None));
    }

    let rarity = machine
        .items
        .iter()
        .find(|slot| slot.item.id == item_id)
        .map(|slot| slot.item.rarity)
        .ok_or(EngineError::NoPullableItems {
            machine_id: machine.id,
        })?;

    Ok(PullOutcome {
        item_id,
        rarity,
        bucket,
        fell_back,
        pity: advance_pity(pity, rarity),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks;
    use arcade_types::{Item, MachineItem};
    use proptest::prelude::*;

    fn pity(super_rare: i32, ultra_rare: i32) -> GachaPityState {
        GachaPityState {
            player_id: 1,
            machine_id: 1,
            super_rare_pity_count: super_rare,
            ultra_rare_pity_count: ultra_rare,
        }
    }

    fn without(machine: &mut GachaMachine, rarity: Rarity) {
        machine.items.retain(|slot| slot.item.rarity != rarity);
    }

    #[test]
    fn bucket_checks_ultra_first() {
        let machine = mocks::gacha_machine();
        assert_eq!(bucket_for(&machine, &pity(0, 0)), Bucket::All);
        assert_eq!(
            bucket_for(&machine, &pity(machine.super_rare_pity, 0)),
            Bucket::SuperRare
        );
        assert_eq!(
            bucket_for(
                &machine,
                &pity(machine.super_rare_pity, machine.ultra_rare_pity)
            ),
            Bucket::UltraRare
        );
    }

    #[test]
    fn transition_table() {
        let start = pity(4, 7);
        assert_eq!(advance_pity(&start, Rarity::UltraRare), pity(5, 0));
        assert_eq!(advance_pity(&start, Rarity::SuperRare), pity(0, 8));
        for rarity in [Rarity::Common, Rarity::Rare, Rarity::Epic] {
            assert_eq!(advance_pity(&start, rarity), pity(5, 8));
        }
    }

    #[test]
    fn forced_ultra_pull() {
        let machine = mocks::gacha_machine();
        let sampler = Sampler::seeded(17);
        for _ in 0..200 {
            let outcome = pull_once(&sampler, &machine, &pity(0, machine.ultra_rare_pity)).unwrap();
            assert_eq!(outcome.rarity, Rarity::UltraRare);
            assert_eq!(outcome.bucket, Bucket::UltraRare);
            assert!(!outcome.fell_back);
            assert_eq!(outcome.pity.ultra_rare_pity_count, 0);
        }
    }

    #[test]
    fn ultra_pity_forces_on_the_pull_after_the_threshold_is_reached() {
        let mut machine = mocks::gacha_machine();
        // Only commons are pulled naturally.
        for slot in &mut machine.items {
            if slot.item.rarity == Rarity::UltraRare {
                slot.item.pull_weight = 1;
            } else if slot.item.rarity == Rarity::Common {
                slot.item.pull_weight = 1_000_000;
            }
        }
        without(&mut machine, Rarity::SuperRare);
        let sampler = Sampler::seeded(23);

        let start = pity(0, machine.ultra_rare_pity - 1);
        let first = pull_once(&sampler, &machine, &start).unwrap();
        assert_eq!(first.bucket, Bucket::All);
        if first.rarity != Rarity::UltraRare {
            let second = pull_once(&sampler, &machine, &first.pity).unwrap();
            assert_eq!(second.rarity, Rarity::UltraRare);
        }
    }

    #[test]
    fn forced_super_pull() {
        let machine = mocks::gacha_machine();
        let sampler = Sampler::seeded(19);
        let outcome = pull_once(&sampler, &machine, &pity(machine.super_rare_pity, 0)).unwrap();
        assert_eq!(outcome.rarity, Rarity::SuperRare);
        assert_eq!(outcome.pity.super_rare_pity_count, 0);
        assert_eq!(outcome.pity.ultra_rare_pity_count, 1);
    }

    #[test]
    fn empty_forced_bucket_falls_back_to_all_items() {
        let mut machine = mocks::gacha_machine();
        without(&mut machine, Rarity::UltraRare);
        let sampler = Sampler::seeded(29);
        let outcome = pull_once(&sampler, &machine, &pity(0, machine.ultra_rare_pity)).unwrap();
        assert_eq!(outcome.bucket, Bucket::UltraRare);
        assert!(outcome.fell_back);
        assert_ne!(outcome.rarity, Rarity::UltraRare);
    }

    #[test]
    fn machine_without_weight_cannot_pull() {
        let mut machine = mocks::gacha_machine();
        for slot in &mut machine.items {
            slot.item.pull_weight = 0;
        }
        assert_eq!(
            pull_once(&Sampler::seeded(1), &machine, &pity(0, 0)),
            Err(EngineError::NoPullableItems {
                machine_id: machine.id
            })
        );
    }

    #[test]
    fn ten_pulls_apply_ten_transitions() {
        let machine = GachaMachine {
            items: vec![MachineItem {
                id: 1,
                item: Item {
                    id: 99,
                    name: "Pebble".to_string(),
                    rarity: Rarity::Common,
                    spawn_percentage: 0,
                    catch_percentage: 0,
                    pull_weight: 1,
                    max_item_spawned: 0,
                },
            }],
            ..mocks::gacha_machine()
        };
        let sampler = Sampler::seeded(31);
        let mut state = pity(0, 0);
        for _ in 0..10 {
            let outcome = pull_once(&sampler, &machine, &state).unwrap();
            assert_eq!(outcome.item_id, 99);
            state = outcome.pity;
        }
        assert_eq!(state, pity(10, 10));
    }

    proptest! {
        #[test]
        fn counters_follow_the_pulled_rarity(
            seed in any::<u64>(),
            super_rare in 0i32..20,
            ultra_rare in 0i32..100,
        ) {
            let machine = mocks::gacha_machine();
            let sampler = Sampler::seeded(seed);
            let before = pity(super_rare, ultra_rare);
            let outcome = pull_once(&sampler, &machine, &before).unwrap();
            match outcome.rarity {
                Rarity::UltraRare => {
                    prop_assert_eq!(outcome.pity.ultra_rare_pity_count, 0);
                    prop_assert_eq!(outcome.pity.super_rare_pity_count, super_rare + 1);
                }
                Rarity::SuperRare => {
                    prop_assert_eq!(outcome.pity.super_rare_pity_count, 0);
                    prop_assert_eq!(outcome.pity.ultra_rare_pity_count, ultra_rare + 1);
                }
                _ => {
                    prop_assert_eq!(outcome.pity.super_rare_pity_count, super_rare + 1);
                    prop_assert_eq!(outcome.pity.ultra_rare_pity_count, ultra_rare + 1);
                }
            }
        }
    }
}
