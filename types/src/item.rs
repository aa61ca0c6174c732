use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

use crate::{MULTI_PULL, SINGLE_PULL};

/// Item rarity tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    SuperRare,
    UltraRare,
    Epic,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::SuperRare,
        Rarity::UltraRare,
        Rarity::Epic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::SuperRare => "super_rare",
            Rarity::UltraRare => "ultra_rare",
            Rarity::Epic => "epic",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
#[error("unknown rarity: {0}")]
pub struct UnknownRarity(pub String);

impl FromStr for Rarity {
    type Err = UnknownRarity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL
            .into_iter()
            .find(|rarity| rarity.as_str() == s)
            .ok_or_else(|| UnknownRarity(s.to_string()))
    }
}

/// Catalogue item shared by every machine type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub rarity: Rarity,
    #[serde(default)]
    pub spawn_percentage: i64,
    #[serde(default)]
    pub catch_percentage: i64,
    #[serde(default)]
    pub pull_weight: i32,
    #[serde(default)]
    pub max_item_spawned: i64,
}

/// A slot of a machine: the machine-local row id and the item it holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineItem {
    pub id: i64,
    pub item: Item,
}

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum MachineConfigError {
    #[error("machine {machine_id} has no items")]
    Empty { machine_id: i64 },
    #[error("item {item_id} has a zero catch percentage")]
    ZeroCatchPercentage { item_id: i64 },
    #[error("item {item_id} has a non-positive pull weight ({weight})")]
    NonPositivePullWeight { item_id: i64, weight: i32 },
    #[error("item {item_id} has a negative spawn weight ({weight})")]
    NegativeSpawnWeight { item_id: i64, weight: i64 },
    #[error("machine {machine_id} has an output cap below one ({max_item})")]
    InvalidMaxItem { machine_id: i64, max_item: i32 },
    #[error("machine {machine_id} has a negative price")]
    NegativePrice { machine_id: i64 },
    #[error("machine {machine_id} has invalid pity thresholds (super={super_rare}, ultra={ultra_rare})")]
    InvalidPity {
        machine_id: i64,
        super_rare: i32,
        ultra_rare: i32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClawMachine {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub max_item: i32,
    pub items: Vec<MachineItem>,
}

impl ClawMachine {
    pub fn validate(&self) -> Result<(), MachineConfigError> {
        if self.items.is_empty() {
            return Err(MachineConfigError::Empty {
                machine_id: self.id,
            });
        }
        if self.max_item < 1 {
            return Err(MachineConfigError::InvalidMaxItem {
                machine_id: self.id,
                max_item: self.max_item,
            });
        }
        if self.price < 0 {
            return Err(MachineConfigError::NegativePrice {
                machine_id: self.id,
            });
        }
        for MachineItem { item, .. } in &self.items {
            if item.catch_percentage <= 0 {
                return Err(MachineConfigError::ZeroCatchPercentage { item_id: item.id });
            }
            if item.spawn_percentage < 0 {
                return Err(MachineConfigError::NegativeSpawnWeight {
                    item_id: item.id,
                    weight: item.spawn_percentage,
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GachaMachine {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub price_times_ten: i64,
    pub super_rare_pity: i32,
    pub ultra_rare_pity: i32,
    pub items: Vec<MachineItem>,
}

impl GachaMachine {
    pub fn validate(&self) -> Result<(), MachineConfigError> {
        if self.items.is_empty() {
            return Err(MachineConfigError::Empty {
                machine_id: self.id,
            });
        }
        if self.price < 0 || self.price_times_ten < 0 {
            return Err(MachineConfigError::NegativePrice {
                machine_id: self.id,
            });
        }
        if self.super_rare_pity < 1 || self.ultra_rare_pity < self.super_rare_pity {
            return Err(MachineConfigError::InvalidPity {
                machine_id: self.id,
                super_rare: self.super_rare_pity,
                ultra_rare: self.ultra_rare_pity,
            });
        }
        for MachineItem { item, .. } in &self.items {
            if item.pull_weight <= 0 {
                return Err(MachineConfigError::NonPositivePullWeight {
                    item_id: item.id,
                    weight: item.pull_weight,
                });
            }
        }
        Ok(())
    }

    /// Price charged for a request of `pull_count` pulls, if the count is offered.
    pub fn price_for(&self, pull_count: i32) -> Option<i64> {
        match pull_count {
            SINGLE_PULL => Some(self.price),
            MULTI_PULL => Some(self.price_times_ten),
            _ => None,
        }
    }

    pub fn items_of(&self, rarity: Rarity) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .map(|slot| &slot.item)
            .filter(move |item| item.rarity == rarity)
    }
}
