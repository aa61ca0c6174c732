//! Catalogue bootstrap from YAML.

use anyhow::{Context, Result};
use arcade_types::{Account, ClawMachine, GachaMachine, MoleWeight};
use serde::Deserialize;
use std::{future::Future, path::Path};

use crate::{MemoryStore, StoreError};

/// Machines, mole weights and starting accounts written into a store on start-up.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SeedData {
    pub claw_machines: Vec<ClawMachine>,
    pub gacha_machines: Vec<GachaMachine>,
    pub mole_weights: Vec<MoleWeight>,
    pub accounts: Vec<Account>,
}

impl SeedData {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("parse catalogue")
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read catalogue {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    /// Rejects machines that could never be played.
    pub fn validate(&self) -> Result<()> {
        for machine in &self.claw_machines {
            machine
                .validate()
                .with_context(|| format!("claw machine {}", machine.id))?;
        }
        for machine in &self.gacha_machines {
            machine
                .validate()
                .with_context(|| format!("gacha machine {}", machine.id))?;
        }
        Ok(())
    }
}

/// Stores that can be populated from [`SeedData`]. Seeding is an upsert.
pub trait Seedable: Send + Sync {
    fn seed(&self, data: &SeedData) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl Seedable for MemoryStore {
    async fn seed(&self, data: &SeedData) -> Result<(), StoreError> {
        for machine in &data.claw_machines {
            self.insert_claw_machine(machine.clone());
        }
        for machine in &data.gacha_machines {
            self.insert_gacha_machine(machine.clone());
        }
        for weight in &data.mole_weights {
            self.insert_mole_weight(weight.clone());
        }
        for account in &data.accounts {
            self.insert_account(account.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Catalogue, Wallet};
    use arcade_types::Rarity;

    const CATALOGUE: &str = r#"
claw_machines:
  - id: 1
    name: Plush Grabber
    price: 100
    max_item: 3
    items:
      - id: 1
        item:
          id: 101
          name: Bear
          rarity: common
          spawn_percentage: 50
          catch_percentage: 30
          pull_weight: 1
          max_item_spawned: 2
gacha_machines:
  - id: 2
    name: Star Capsule
    price: 10
    price_times_ten: 90
    super_rare_pity: 10
    ultra_rare_pity: 90
    items:
      - id: 1
        item:
          id: 201
          name: Sun Crown
          rarity: ultra_rare
          spawn_percentage: 0
          catch_percentage: 1
          pull_weight: 5
          max_item_spawned: 0
mole_weights:
  - id: 1
    mole_type: golden
    weight: 20
accounts:
  - id: 7
    username: ada
    coin: 500
    diamond: 3
"#;

    #[test]
    fn parses_catalogue() {
        let data = SeedData::from_yaml_str(CATALOGUE).unwrap();
        assert_eq!(data.claw_machines[0].items[0].item.name, "Bear");
        assert_eq!(
            data.gacha_machines[0].items[0].item.rarity,
            Rarity::UltraRare
        );
        assert_eq!(data.accounts[0].wallet.diamond, 3);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn validate_names_the_broken_machine() {
        let mut data = SeedData::from_yaml_str(CATALOGUE).unwrap();
        data.claw_machines[0].items[0].item.catch_percentage = 0;
        let err = data.validate().unwrap_err();
        assert!(format!("{err:#}").contains("claw machine 1"));
    }

    #[tokio::test]
    async fn seeds_memory_store() {
        let data = SeedData::from_yaml_str(CATALOGUE).unwrap();
        let store = MemoryStore::new();
        store.seed(&data).await.unwrap();

        assert_eq!(store.claw_machine(1).await.unwrap().unwrap().price, 100);
        assert_eq!(store.gacha_machine(2).await.unwrap().unwrap().items.len(), 1);
        assert_eq!(store.mole_weights().await.unwrap().len(), 1);
        assert_eq!(store.account(7).await.unwrap().unwrap().wallet.coin, 500);
    }
}
