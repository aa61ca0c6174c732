//! Collaborator contracts.
//!
//! Every operation may suspend on I/O. Implementations live in [`crate::memory`],
//! [`crate::sqlite`], [`crate::cache`], and [`crate::stream`].

use arcade_types::{
    Account, ClawMachine, ClawMachineGameRecord, GachaMachine, GachaPityState, GachaPullHistory,
    GachaPullSession, LeaderboardRow, MoleWeight, TouchedItemRecord, Verdict,
};
use std::{future::Future, time::Duration};

use crate::StoreError;

/// Read-mostly machine and item configuration.
pub trait Catalogue: Send + Sync {
    fn claw_machine(
        &self,
        machine_id: i64,
    ) -> impl Future<Output = Result<Option<ClawMachine>, StoreError>> + Send;

    fn gacha_machine(
        &self,
        machine_id: i64,
    ) -> impl Future<Output = Result<Option<GachaMachine>, StoreError>> + Send;

    fn mole_weights(&self) -> impl Future<Output = Result<Vec<MoleWeight>, StoreError>> + Send;
}

/// Outcome of a debit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Debit {
    Charged { balance: i64 },
    Insufficient { balance: i64 },
}

/// Player balances.
pub trait Wallet: Send + Sync {
    fn account(
        &self,
        player_id: i64,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Adds `delta` to the coin balance and returns the new balance.
    fn adjust_coin(
        &self,
        player_id: i64,
        delta: i64,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Takes `amount` coins, leaving the balance untouched when it would go negative.
    /// Check and subtract happen atomically.
    fn debit_coin(
        &self,
        player_id: i64,
        amount: i64,
    ) -> impl Future<Output = Result<Debit, StoreError>> + Send;
}

/// Append-only game and pull records.
pub trait History: Send + Sync {
    /// Persists a game header and returns its id.
    fn create_claw_game(
        &self,
        header: ClawMachineGameRecord,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn append_touched_item(
        &self,
        game_id: i64,
        record: TouchedItemRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn claw_game(
        &self,
        game_id: i64,
    ) -> impl Future<Output = Result<Option<ClawMachineGameRecord>, StoreError>> + Send;

    fn claw_games_for_player(
        &self,
        player_id: i64,
    ) -> impl Future<Output = Result<Vec<ClawMachineGameRecord>, StoreError>> + Send;

    /// Creates a pull session with one history row per item id, atomically.
    ///
    /// Keyed by `source`: repeating a call with the same key writes nothing and
    /// returns the session created first.
    fn record_pull_batch(
        &self,
        source: &str,
        session: GachaPullSession,
        item_ids: &[i64],
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    fn pull_sessions(
        &self,
        player_id: i64,
    ) -> impl Future<Output = Result<Vec<GachaPullSession>, StoreError>> + Send;

    fn pull_histories(
        &self,
        session_id: i64,
    ) -> impl Future<Output = Result<Vec<GachaPullHistory>, StoreError>> + Send;
}

/// Authoritative pity counters.
pub trait PityStore: Send + Sync {
    fn load_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> impl Future<Output = Result<Option<GachaPityState>, StoreError>> + Send;

    fn save_pity(
        &self,
        state: GachaPityState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait LeaderboardStore: Send + Sync {
    fn leaderboard_row(
        &self,
        player_id: i64,
    ) -> impl Future<Output = Result<Option<LeaderboardRow>, StoreError>> + Send;

    /// Stores `score` if it beats the current one (or the row is new). New rows start
    /// unranked. Returns whether anything was written.
    fn raise_score(
        &self,
        player_id: i64,
        username: &str,
        score: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Ranked rows in rank order.
    fn top_ranked(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LeaderboardRow>, StoreError>> + Send;

    /// Recomputes every rank in one transaction and returns the number of ranked rows.
    fn materialise(&self, rank_limit: usize)
        -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Everything the orchestrator needs from durable storage.
pub trait Store: Catalogue + Wallet + History + PityStore + LeaderboardStore {}

impl<T: Catalogue + Wallet + History + PityStore + LeaderboardStore> Store for T {}

/// Short-lived verdict lists keyed by game id.
pub trait VerdictCache: Send + Sync {
    fn put_verdicts(
        &self,
        game_id: i64,
        verdicts: &[Verdict],
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_verdicts(
        &self,
        game_id: i64,
    ) -> impl Future<Output = Result<Option<Vec<Verdict>>, StoreError>> + Send;

    fn delete_verdicts(&self, game_id: i64)
        -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Non-authoritative mirror of in-progress pity counters.
pub trait PityCache: Send + Sync {
    fn stage_pity(
        &self,
        state: &GachaPityState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn cached_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> impl Future<Output = Result<Option<GachaPityState>, StoreError>> + Send;

    fn delete_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait Cache: VerdictCache + PityCache {}

impl<T: VerdictCache + PityCache> Cache for T {}

/// An entry read from the event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: String,
    /// Value of the `data` field, if present.
    pub data: Option<String>,
}

/// Append-only log read through a consumer group.
pub trait EventStream: Send + Sync {
    /// Creates the consumer group if it does not exist yet.
    fn ensure_group(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn publish(&self, data: String) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Entries delivered to this consumer but never acked, with ids after `after`.
    /// Pass `"0"` to start from the oldest. Never blocks.
    fn read_pending(
        &self,
        after: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<StreamEntry>, StoreError>> + Send;

    /// Entries never delivered to the group. Waits up to `block` when there are none.
    fn read_new(
        &self,
        count: usize,
        block: Duration,
    ) -> impl Future<Output = Result<Vec<StreamEntry>, StoreError>> + Send;

    fn ack(&self, entry_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
