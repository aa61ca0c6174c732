//! Shared types for the arcade reward core.
//!
//! Machine and item configuration, wallet and history records, the JSON
//! gacha stream message, and the binary envelope exchanged with game clients.

pub mod codec;
pub mod constants;
pub mod envelope;
pub mod item;
pub mod player;
pub mod records;
pub mod stream;

pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use envelope::*;
pub use item::{ClawMachine, GachaMachine, Item, MachineConfigError, MachineItem, Rarity};
pub use player::{Account, Player, Wallet};
pub use records::{
    ClawMachineGameRecord, GachaPityState, GachaPullHistory, GachaPullSession, LeaderboardRow,
    MoleWeight, TouchedItemRecord, Verdict,
};
pub use stream::{GachaEvent, StreamMessageError, GACHA_EVENT_TYPE, STREAM_DATA_FIELD};

#[cfg(test)]
mod tests;
