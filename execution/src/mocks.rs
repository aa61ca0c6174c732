//! Machine fixtures for tests.

use arcade_types::{ClawMachine, GachaMachine, Item, MachineItem, MoleWeight, Rarity};

pub fn item(id: i64, name: &str, rarity: Rarity) -> Item {
    Item {
        id,
        name: name.to_string(),
        rarity,
        spawn_percentage: 25,
        catch_percentage: 40,
        pull_weight: 10,
        max_item_spawned: 3,
    }
}

fn slots(items: Vec<Item>) -> Vec<MachineItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| MachineItem {
            id: i as i64 + 1,
            item,
        })
        .collect()
}

/// Four-item claw machine costing 100 coins.
pub fn claw_machine() -> ClawMachine {
    ClawMachine {
        id: 1,
        name: "Plush Grabber".to_string(),
        price: 100,
        max_item: 6,
        items: slots(vec![
            item(101, "Bear", Rarity::Common),
            item(102, "Bunny", Rarity::Common),
            item(103, "Dragon", Rarity::Rare),
            item(104, "Phoenix", Rarity::Epic),
        ]),
    }
}

/// Gacha machine with every rarity, pity thresholds 10/90.
pub fn gacha_machine() -> GachaMachine {
    let mut items = vec![
        item(201, "Copper Coin", Rarity::Common),
        item(202, "Silver Coin", Rarity::Common),
        item(203, "Sapphire", Rarity::Rare),
        item(204, "Amethyst", Rarity::Epic),
        item(205, "Star Shard", Rarity::SuperRare),
        item(206, "Moonstone", Rarity::SuperRare),
        item(207, "Sun Crown", Rarity::UltraRare),
    ];
    items[0].pull_weight = 400;
    items[1].pull_weight = 300;
    items[2].pull_weight = 150;
    items[3].pull_weight = 80;
    items[4].pull_weight = 40;
    items[5].pull_weight = 25;
    items[6].pull_weight = 5;

    GachaMachine {
        id: 2,
        name: "Star Capsule".to_string(),
        price: 10,
        price_times_ten: 90,
        super_rare_pity: 10,
        ultra_rare_pity: 90,
        items: slots(items),
    }
}

pub fn mole_weights() -> Vec<MoleWeight> {
    [("normal", 70), ("golden", 20), ("bomb", 10)]
        .into_iter()
        .enumerate()
        .map(|(i, (mole_type, weight))| MoleWeight {
            id: i as i64 + 1,
            mole_type: mole_type.to_string(),
            weight,
        })
        .collect()
}
