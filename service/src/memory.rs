//! In-process implementations of every collaborator.

use arcade_execution::{accepts_score, materialise};
use arcade_types::{
    pity_key, verdict_key, Account, ClawMachine, ClawMachineGameRecord, GachaMachine,
    GachaPityState, GachaPullHistory, GachaPullSession, LeaderboardRow, MoleWeight,
    TouchedItemRecord, Verdict, PITY_FIELD_SUPER, PITY_FIELD_ULTRA,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};
use tokio::sync::Notify;

use crate::{
    store::{
        Catalogue, Debit, EventStream, History, LeaderboardStore, PityCache, PityStore,
        StreamEntry, VerdictCache, Wallet,
    },
    StoreError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("memory store offline".to_string())
}

#[derive(Default)]
struct Tables {
    claw_machines: BTreeMap<i64, ClawMachine>,
    gacha_machines: BTreeMap<i64, GachaMachine>,
    mole_weights: Vec<MoleWeight>,
    accounts: BTreeMap<i64, Account>,
    claw_games: BTreeMap<i64, ClawMachineGameRecord>,
    pull_sessions: BTreeMap<i64, GachaPullSession>,
    pull_sources: HashMap<String, i64>,
    pull_histories: Vec<GachaPullHistory>,
    pity: HashMap<(i64, i64), GachaPityState>,
    leaderboard: Vec<LeaderboardRow>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Durable-store stand-in. Can be switched offline to exercise failure paths.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
    pity_writes_failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Fails only [`PityStore::save_pity`], leaving wallets and history reachable.
    pub fn set_pity_writes_failing(&self, failing: bool) {
        self.pity_writes_failing.store(failing, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(lock(&self.tables))
    }

    pub fn insert_claw_machine(&self, machine: ClawMachine) {
        lock(&self.tables).claw_machines.insert(machine.id, machine);
    }

    pub fn insert_gacha_machine(&self, machine: GachaMachine) {
        lock(&self.tables).gacha_machines.insert(machine.id, machine);
    }

    pub fn insert_mole_weight(&self, weight: MoleWeight) {
        let mut tables = lock(&self.tables);
        tables.mole_weights.retain(|existing| existing.id != weight.id);
        tables.mole_weights.push(weight);
    }

    /// Inserts a game record under its own id; later ids continue past it.
    pub fn insert_claw_game(&self, game: ClawMachineGameRecord) {
        let mut tables = lock(&self.tables);
        tables.next_id = tables.next_id.max(game.game_id);
        tables.claw_games.insert(game.game_id, game);
    }

    pub fn insert_account(&self, account: Account) {
        lock(&self.tables).accounts.insert(account.player.id, account);
    }
}

impl Catalogue for MemoryStore {
    async fn claw_machine(&self, machine_id: i64) -> Result<Option<ClawMachine>, StoreError> {
        Ok(self.tables()?.claw_machines.get(&machine_id).cloned())
    }

    async fn gacha_machine(&self, machine_id: i64) -> Result<Option<GachaMachine>, StoreError> {
        Ok(self.tables()?.gacha_machines.get(&machine_id).cloned())
    }

    async fn mole_weights(&self) -> Result<Vec<MoleWeight>, StoreError> {
        Ok(self.tables()?.mole_weights.clone())
    }
}

impl Wallet for MemoryStore {
    async fn account(&self, player_id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.tables()?.accounts.get(&player_id).cloned())
    }

    async fn adjust_coin(&self, player_id: i64, delta: i64) -> Result<i64, StoreError> {
        let mut tables = self.tables()?;
        let account = tables
            .accounts
            .get_mut(&player_id)
            .ok_or(StoreError::NotFound {
                entity: "player",
                id: player_id,
            })?;
        account.wallet.coin += delta;
        Ok(account.wallet.coin)
    }

    async fn debit_coin(&self, player_id: i64, amount: i64) -> Result<Debit, StoreError> {
        let mut tables = self.tables()?;
        let wallet = &mut tables
            .accounts
            .get_mut(&player_id)
            .ok_or(StoreError::NotFound {
                entity: "player",
                id: player_id,
            })?
            .wallet;
        if wallet.coin < amount {
            return Ok(Debit::Insufficient {
                balance: wallet.coin,
            });
        }
        wallet.coin -= amount;
        Ok(Debit::Charged {
            balance: wallet.coin,
        })
    }
}

impl History for MemoryStore {
    async fn create_claw_game(&self, header: ClawMachineGameRecord) -> Result<i64, StoreError> {
        let mut tables = self.tables()?;
        let game_id = tables.next_id();
        tables.claw_games.insert(
            game_id,
            ClawMachineGameRecord {
                game_id,
                ..header
            },
        );
        Ok(game_id)
    }

    async fn append_touched_item(
        &self,
        game_id: i64,
        record: TouchedItemRecord,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        let game = tables
            .claw_games
            .get_mut(&game_id)
            .ok_or(StoreError::NotFound {
                entity: "claw game",
                id: game_id,
            })?;
        game.success |= record.catched;
        game.item_records.push(record);
        Ok(())
    }

    async fn claw_game(&self, game_id: i64) -> Result<Option<ClawMachineGameRecord>, StoreError> {
        Ok(self.tables()?.claw_games.get(&game_id).cloned())
    }

    async fn claw_games_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<ClawMachineGameRecord>, StoreError> {
        Ok(self
            .tables()?
            .claw_games
            .values()
            .filter(|game| game.player_id == player_id)
            .cloned()
            .collect())
    }

    async fn record_pull_batch(
        &self,
        source: &str,
        session: GachaPullSession,
        item_ids: &[i64],
    ) -> Result<i64, StoreError> {
        let mut tables = self.tables()?;
        if let Some(session_id) = tables.pull_sources.get(source) {
            return Ok(*session_id);
        }

        let session_id = tables.next_id();
        tables.pull_sessions.insert(
            session_id,
            GachaPullSession {
                id: session_id,
                ..session
            },
        );
        for item_id in item_ids {
            let id = tables.next_id();
            tables.pull_histories.push(GachaPullHistory {
                id,
                session_id,
                item_id: *item_id,
            });
        }
        tables.pull_sources.insert(source.to_string(), session_id);
        Ok(session_id)
    }

    async fn pull_sessions(&self, player_id: i64) -> Result<Vec<GachaPullSession>, StoreError> {
        Ok(self
            .tables()?
            .pull_sessions
            .values()
            .filter(|session| session.player_id == player_id)
            .copied()
            .collect())
    }

    async fn pull_histories(&self, session_id: i64) -> Result<Vec<GachaPullHistory>, StoreError> {
        Ok(self
            .tables()?
            .pull_histories
            .iter()
            .filter(|history| history.session_id == session_id)
            .copied()
            .collect())
    }
}

impl PityStore for MemoryStore {
    async fn load_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> Result<Option<GachaPityState>, StoreError> {
        Ok(self.tables()?.pity.get(&(machine_id, player_id)).copied())
    }

    async fn save_pity(&self, state: GachaPityState) -> Result<(), StoreError> {
        if self.pity_writes_failing.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.tables()?
            .pity
            .insert((state.machine_id, state.player_id), state);
        Ok(())
    }
}

impl LeaderboardStore for MemoryStore {
    async fn leaderboard_row(&self, player_id: i64) -> Result<Option<LeaderboardRow>, StoreError> {
        Ok(self
            .tables()?
            .leaderboard
            .iter()
            .find(|row| row.player_id == player_id)
            .cloned())
    }

    async fn raise_score(
        &self,
        player_id: i64,
        username: &str,
        score: i64,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        if let Some(row) = tables
            .leaderboard
            .iter_mut()
            .find(|row| row.player_id == player_id)
        {
            if !accepts_score(Some(row.score), score) {
                return Ok(false);
            }
            row.score = score;
            return Ok(true);
        }
        tables.leaderboard.push(LeaderboardRow {
            player_id,
            username: username.to_string(),
            score,
            rank: 0,
        });
        Ok(true)
    }

    async fn top_ranked(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StoreError> {
        let tables = self.tables()?;
        let mut rows: Vec<_> = tables
            .leaderboard
            .iter()
            .filter(|row| row.rank > 0)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn materialise(&self, rank_limit: usize) -> Result<usize, StoreError> {
        let mut tables = self.tables()?;
        materialise(&mut tables.leaderboard, rank_limit);
        Ok(tables.leaderboard.iter().filter(|row| row.rank > 0).count())
    }
}

enum CacheValue {
    Json(String),
    Hash(HashMap<String, String>),
}

struct CacheEntry {
    value: CacheValue,
    expires_at: Option<Instant>,
}

/// Key-value cache laid out like the Redis one: JSON strings and field hashes.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    offline: AtomicBool,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<_> = lock(&self.entries)
            .iter()
            .filter(|(_, entry)| entry.expires_at.map_or(true, |at| at > now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory cache offline".to_string()));
        }
        let mut entries = lock(&self.entries);
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
        Ok(entries)
    }
}

impl VerdictCache for MemoryCache {
    async fn put_verdicts(
        &self,
        game_id: i64,
        verdicts: &[Verdict],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(verdicts)?;
        self.entries()?.insert(
            verdict_key(game_id),
            CacheEntry {
                value: CacheValue::Json(json),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get_verdicts(&self, game_id: i64) -> Result<Option<Vec<Verdict>>, StoreError> {
        let entries = self.entries()?;
        match entries.get(&verdict_key(game_id)) {
            Some(CacheEntry {
                value: CacheValue::Json(json),
                ..
            }) => Ok(Some(serde_json::from_str(json)?)),
            Some(_) => Err(StoreError::Corrupt(format!(
                "{} is not a verdict list",
                verdict_key(game_id)
            ))),
            None => Ok(None),
        }
    }

    async fn delete_verdicts(&self, game_id: i64) -> Result<(), StoreError> {
        self.entries()?.remove(&verdict_key(game_id));
        Ok(())
    }
}

impl PityCache for MemoryCache {
    async fn stage_pity(&self, state: &GachaPityState) -> Result<(), StoreError> {
        let fields = HashMap::from([
            (
                PITY_FIELD_ULTRA.to_string(),
                state.ultra_rare_pity_count.to_string(),
            ),
            (
                PITY_FIELD_SUPER.to_string(),
                state.super_rare_pity_count.to_string(),
            ),
        ]);
        self.entries()?.insert(
            pity_key(state.machine_id, state.player_id),
            CacheEntry {
                value: CacheValue::Hash(fields),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn cached_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> Result<Option<GachaPityState>, StoreError> {
        let entries = self.entries()?;
        let Some(entry) = entries.get(&pity_key(machine_id, player_id)) else {
            return Ok(None);
        };
        let CacheValue::Hash(fields) = &entry.value else {
            return Err(StoreError::Corrupt("pity entry is not a hash".to_string()));
        };
        crate::cache::pity_from_fields(machine_id, player_id, fields).map(Some)
    }

    async fn delete_pity(&self, machine_id: i64, player_id: i64) -> Result<(), StoreError> {
        self.entries()?.remove(&pity_key(machine_id, player_id));
        Ok(())
    }
}

#[derive(Default)]
struct StreamLog {
    entries: Vec<(String, String)>,
    group_created: bool,
    delivered: usize,
    pending: BTreeMap<usize, String>,
}

/// Single-group, single-consumer stream with Redis-like pending semantics.
#[derive(Default)]
pub struct MemoryStream {
    log: Mutex<StreamLog>,
    published: Notify,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries delivered but not acked.
    pub fn pending_count(&self) -> usize {
        lock(&self.log).pending.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.log).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn log(&self) -> Result<MutexGuard<'_, StreamLog>, StoreError> {
        let log = lock(&self.log);
        if !log.group_created {
            return Err(StoreError::Unavailable(
                "NOGROUP consumer group does not exist".to_string(),
            ));
        }
        Ok(log)
    }

    fn take_new(&self, count: usize) -> Result<Vec<StreamEntry>, StoreError> {
        let mut log = self.log()?;
        let end = (log.delivered + count).min(log.entries.len());
        let mut batch = Vec::with_capacity(end - log.delivered);
        for index in log.delivered..end {
            let (id, data) = log.entries[index].clone();
            log.pending.insert(index, id.clone());
            batch.push(StreamEntry {
                id,
                data: Some(data),
            });
        }
        log.delivered = end;
        Ok(batch)
    }
}

impl EventStream for MemoryStream {
    async fn ensure_group(&self) -> Result<(), StoreError> {
        lock(&self.log).group_created = true;
        Ok(())
    }

    async fn publish(&self, data: String) -> Result<String, StoreError> {
        let id = {
            let mut log = lock(&self.log);
            let id = format!("{}-0", log.entries.len() + 1);
            log.entries.push((id.clone(), data));
            id
        };
        self.published.notify_waiters();
        Ok(id)
    }

    async fn read_pending(
        &self,
        after: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let log = self.log()?;
        let start = log
            .entries
            .iter()
            .position(|(id, _)| id == after)
            .map_or(0, |index| index + 1);
        Ok(log
            .pending
            .range(start..)
            .take(count)
            .map(|(index, id)| StreamEntry {
                id: id.clone(),
                data: Some(log.entries[*index].1.clone()),
            })
            .collect())
    }

    async fn read_new(
        &self,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let notified = self.published.notified();
        let batch = self.take_new(count)?;
        if !batch.is_empty() || block.is_zero() {
            return Ok(batch);
        }
        let _ = tokio::time::timeout(block, notified).await;
        self.take_new(count)
    }

    async fn ack(&self, entry_id: &str) -> Result<(), StoreError> {
        lock(&self.log).pending.retain(|_, id| id != entry_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(item_id: i64, success: bool) -> Verdict {
        Verdict {
            item_id,
            name: format!("item-{item_id}"),
            success,
        }
    }

    #[tokio::test]
    async fn verdicts_vanish_once_their_ttl_elapses() {
        let cache = MemoryCache::new();
        let verdicts = vec![verdict(1, true), verdict(2, false)];
        cache
            .put_verdicts(5, &verdicts, Duration::from_millis(40))
            .await
            .unwrap();
        assert_eq!(cache.get_verdicts(5).await.unwrap(), Some(verdicts));
        assert_eq!(cache.keys(), vec![verdict_key(5)]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get_verdicts(5).await.unwrap(), None);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn debit_never_overdraws() {
        let store = MemoryStore::new();
        store.insert_account(Account::new(3, "grace", 120));

        assert_eq!(
            store.debit_coin(3, 100).await.unwrap(),
            Debit::Charged { balance: 20 }
        );
        assert_eq!(
            store.debit_coin(3, 100).await.unwrap(),
            Debit::Insufficient { balance: 20 }
        );
        assert!(matches!(
            store.debit_coin(4, 1).await,
            Err(StoreError::NotFound { id: 4, .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_debits_charge_at_most_the_balance() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.insert_account(Account::new(3, "grace", 500));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move { store.debit_coin(3, 100).await.unwrap() })
            })
            .collect();
        let mut charged = 0;
        for handle in handles {
            if let Debit::Charged { balance } = handle.await.unwrap() {
                assert!(balance >= 0);
                charged += 1;
            }
        }
        assert_eq!(charged, 5);
        assert_eq!(store.account(3).await.unwrap().unwrap().wallet.coin, 0);
    }

    #[tokio::test]
    async fn pending_reads_resume_after_the_cursor() {
        let stream = MemoryStream::new();
        stream.ensure_group().await.unwrap();
        for data in ["a", "b", "c"] {
            stream.publish(data.to_string()).await.unwrap();
        }
        assert!(stream.read_pending("0", 10).await.unwrap().is_empty());

        let delivered = stream.read_new(10, Duration::ZERO).await.unwrap();
        assert_eq!(delivered.len(), 3);
        stream.ack(&delivered[1].id).await.unwrap();

        let ids = |entries: Vec<StreamEntry>| -> Vec<String> {
            entries.into_iter().map(|entry| entry.id).collect()
        };
        assert_eq!(
            ids(stream.read_pending("0", 10).await.unwrap()),
            vec![delivered[0].id.clone(), delivered[2].id.clone()]
        );
        assert_eq!(
            ids(stream.read_pending(&delivered[0].id, 10).await.unwrap()),
            vec![delivered[2].id.clone()]
        );
        assert!(stream
            .read_pending(&delivered[2].id, 10)
            .await
            .unwrap()
            .is_empty());
        assert!(stream.read_new(10, Duration::ZERO).await.unwrap().is_empty());
    }
}
