use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchedItemRecord {
    pub item_id: i64,
    pub catched: bool,
}

/// A claw game as persisted by the history sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClawMachineGameRecord {
    pub game_id: i64,
    pub claw_machine_id: i64,
    pub player_id: i64,
    pub success: bool,
    pub item_records: Vec<TouchedItemRecord>,
}

impl ClawMachineGameRecord {
    /// A fresh header; the store assigns `game_id`.
    pub fn header(claw_machine_id: i64, player_id: i64) -> Self {
        Self {
            game_id: 0,
            claw_machine_id,
            player_id,
            success: false,
            item_records: Vec::new(),
        }
    }
}

/// Pre-rolled catch outcome for one machine item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "itemID")]
    pub item_id: i64,
    pub name: String,
    pub success: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GachaPityState {
    pub player_id: i64,
    pub machine_id: i64,
    pub super_rare_pity_count: i32,
    pub ultra_rare_pity_count: i32,
}

impl GachaPityState {
    pub fn fresh(machine_id: i64, player_id: i64) -> Self {
        Self {
            player_id,
            machine_id,
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GachaPullSession {
    pub id: i64,
    pub gacha_machine_id: i64,
    pub player_id: i64,
    pub pull_count: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GachaPullHistory {
    pub id: i64,
    pub session_id: i64,
    pub item_id: i64,
}

/// Whack-a-mole leaderboard row; `rank` is 0 outside the materialised top positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub player_id: i64,
    pub username: String,
    pub score: i64,
    pub rank: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoleWeight {
    pub id: i64,
    pub mole_type: String,
    pub weight: i32,
}
