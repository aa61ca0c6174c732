use serde::{Deserialize, Serialize};

/// Base player record embedded in every game-specific player.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub username: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wallet {
    pub coin: i64,
    pub diamond: i64,
}

/// A player together with their balances, as owned by the wallet store.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    pub player: Player,
    #[serde(flatten)]
    pub wallet: Wallet,
}

impl Account {
    pub fn new(id: i64, username: impl Into<String>, coin: i64) -> Self {
        Self {
            player: Player {
                id,
                username: username.into(),
            },
            wallet: Wallet { coin, diamond: 0 },
        }
    }
}
