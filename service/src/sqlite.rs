//! Durable store backed by SQLite.
//!
//! Every operation runs on the blocking pool against one shared connection. Multi-row
//! writes (touched items, pull batches, rank materialisation, seeding) are single
//! transactions.

use anyhow::Context;
use arcade_types::{
    Account, ClawMachine, ClawMachineGameRecord, GachaMachine, GachaPityState, GachaPullHistory,
    GachaPullSession, Item, LeaderboardRow, MachineItem, MoleWeight, Player, Rarity,
    TouchedItemRecord, Wallet as Balance,
};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::{
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{
    seed::{SeedData, Seedable},
    store::{Catalogue, Debit, History, LeaderboardStore, PityStore, Wallet},
    StoreError,
};

const SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA foreign_keys=ON;
CREATE TABLE IF NOT EXISTS item (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    rarity TEXT NOT NULL,
    spawn_percentage INTEGER NOT NULL DEFAULT 0,
    catch_percentage INTEGER NOT NULL DEFAULT 0,
    pull_weight INTEGER NOT NULL DEFAULT 0,
    max_item_spawned INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS claw_machine (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    price INTEGER NOT NULL,
    max_item INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS claw_machine_item (
    id INTEGER PRIMARY KEY,
    claw_machine_id INTEGER NOT NULL REFERENCES claw_machine(id),
    item_id INTEGER NOT NULL REFERENCES item(id)
);
CREATE TABLE IF NOT EXISTS gacha_machine (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    price INTEGER NOT NULL,
    price_times_ten INTEGER NOT NULL,
    super_rare_pity INTEGER NOT NULL,
    ultra_rare_pity INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS gacha_machine_item (
    id INTEGER PRIMARY KEY,
    gacha_machine_id INTEGER NOT NULL REFERENCES gacha_machine(id),
    item_id INTEGER NOT NULL REFERENCES item(id)
);
CREATE TABLE IF NOT EXISTS player (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    coin INTEGER NOT NULL DEFAULT 0,
    diamond INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS claw_machine_game_record (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    claw_machine_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    success INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS claw_touched_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id INTEGER NOT NULL REFERENCES claw_machine_game_record(id),
    item_id INTEGER NOT NULL,
    catched INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS gacha_pity_state (
    machine_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    super_rare_pity_count INTEGER NOT NULL DEFAULT 0,
    ultra_rare_pity_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (machine_id, player_id)
);
CREATE TABLE IF NOT EXISTS gacha_pull_session (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_entry_id TEXT UNIQUE,
    gacha_machine_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    pull_count INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS gacha_pull_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES gacha_pull_session(id),
    item_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS whackamole_leaderboard (
    player_id INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    "rank" INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS whackamole_leaderboard_rank ON whackamole_leaderboard("rank");
CREATE TABLE IF NOT EXISTS whackamole_mole_weight (
    id INTEGER PRIMARY KEY,
    mole_type TEXT NOT NULL,
    weight INTEGER NOT NULL
);
"#;

const CLAW_ITEMS: &str = "SELECT slot.id, i.id, i.name, i.rarity, i.spawn_percentage, \
     i.catch_percentage, i.pull_weight, i.max_item_spawned \
     FROM claw_machine_item slot JOIN item i ON i.id = slot.item_id \
     WHERE slot.claw_machine_id = ?1 ORDER BY slot.id";

const GACHA_ITEMS: &str = "SELECT slot.id, i.id, i.name, i.rarity, i.spawn_percentage, \
     i.catch_percentage, i.pull_weight, i.max_item_spawned \
     FROM gacha_machine_item slot JOIN item i ON i.id = slot.item_id \
     WHERE slot.gacha_machine_id = ?1 ORDER BY slot.id";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open arcade database {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory arcade database")?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA).context("init arcade schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await
        .map_err(|err| StoreError::Unavailable(format!("sqlite task: {err}")))?
    }
}

fn machine_items(
    conn: &Connection,
    sql: &str,
    machine_id: i64,
) -> Result<Vec<MachineItem>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![machine_id], |row| {
        let rarity: String = row.get(3)?;
        let item = Item {
            id: row.get(1)?,
            name: row.get(2)?,
            rarity: Rarity::Common,
            spawn_percentage: row.get(4)?,
            catch_percentage: row.get(5)?,
            pull_weight: row.get(6)?,
            max_item_spawned: row.get(7)?,
        };
        Ok((row.get::<_, i64>(0)?, rarity, item))
    })?;

    let mut items = Vec::new();
    for row in rows {
        let (id, rarity, mut item) = row?;
        item.rarity = rarity
            .parse()
            .map_err(|err| StoreError::Corrupt(format!("item {}: {err}", item.id)))?;
        items.push(MachineItem { id, item });
    }
    Ok(items)
}

fn touched_items(conn: &Connection, game_id: i64) -> Result<Vec<TouchedItemRecord>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT item_id, catched FROM claw_touched_item WHERE game_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![game_id], |row| {
        Ok(TouchedItemRecord {
            item_id: row.get(0)?,
            catched: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
}

fn claw_game(conn: &Connection, game_id: i64) -> Result<Option<ClawMachineGameRecord>, StoreError> {
    let header = conn
        .query_row(
            "SELECT id, claw_machine_id, player_id, success \
             FROM claw_machine_game_record WHERE id = ?1",
            params![game_id],
            |row| {
                Ok(ClawMachineGameRecord {
                    game_id: row.get(0)?,
                    claw_machine_id: row.get(1)?,
                    player_id: row.get(2)?,
                    success: row.get(3)?,
                    item_records: Vec::new(),
                })
            },
        )
        .optional()?;
    let Some(mut game) = header else {
        return Ok(None);
    };
    game.item_records = touched_items(conn, game_id)?;
    Ok(Some(game))
}

fn upsert_item(tx: &Transaction<'_>, item: &Item) -> rusqlite::Result<usize> {
    tx.execute(
        "INSERT INTO item (id, name, rarity, spawn_percentage, catch_percentage, pull_weight, \
         max_item_spawned) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, rarity = excluded.rarity, \
         spawn_percentage = excluded.spawn_percentage, \
         catch_percentage = excluded.catch_percentage, pull_weight = excluded.pull_weight, \
         max_item_spawned = excluded.max_item_spawned",
        params![
            item.id,
            item.name,
            item.rarity.as_str(),
            item.spawn_percentage,
            item.catch_percentage,
            item.pull_weight,
            item.max_item_spawned
        ],
    )
}

fn seed_claw_machine(tx: &Transaction<'_>, machine: &ClawMachine) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO claw_machine (id, name, price, max_item) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, price = excluded.price, \
         max_item = excluded.max_item",
        params![machine.id, machine.name, machine.price, machine.max_item],
    )?;
    tx.execute(
        "DELETE FROM claw_machine_item WHERE claw_machine_id = ?1",
        params![machine.id],
    )?;
    for slot in &machine.items {
        upsert_item(tx, &slot.item)?;
        tx.execute(
            "INSERT INTO claw_machine_item (claw_machine_id, item_id) VALUES (?1, ?2)",
            params![machine.id, slot.item.id],
        )?;
    }
    Ok(())
}

fn seed_gacha_machine(tx: &Transaction<'_>, machine: &GachaMachine) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO gacha_machine (id, name, price, price_times_ten, super_rare_pity, \
         ultra_rare_pity) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, price = excluded.price, \
         price_times_ten = excluded.price_times_ten, \
         super_rare_pity = excluded.super_rare_pity, ultra_rare_pity = excluded.ultra_rare_pity",
        params![
            machine.id,
            machine.name,
            machine.price,
            machine.price_times_ten,
            machine.super_rare_pity,
            machine.ultra_rare_pity
        ],
    )?;
    tx.execute(
        "DELETE FROM gacha_machine_item WHERE gacha_machine_id = ?1",
        params![machine.id],
    )?;
    for slot in &machine.items {
        upsert_item(tx, &slot.item)?;
        tx.execute(
            "INSERT INTO gacha_machine_item (gacha_machine_id, item_id) VALUES (?1, ?2)",
            params![machine.id, slot.item.id],
        )?;
    }
    Ok(())
}

impl Seedable for SqliteStore {
    async fn seed(&self, data: &SeedData) -> Result<(), StoreError> {
        let data = data.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for machine in &data.claw_machines {
                seed_claw_machine(&tx, machine)?;
            }
            for machine in &data.gacha_machines {
                seed_gacha_machine(&tx, machine)?;
            }
            for weight in &data.mole_weights {
                tx.execute(
                    "INSERT INTO whackamole_mole_weight (id, mole_type, weight) \
                     VALUES (?1, ?2, ?3) ON CONFLICT(id) DO UPDATE SET \
                     mole_type = excluded.mole_type, weight = excluded.weight",
                    params![weight.id, weight.mole_type, weight.weight],
                )?;
            }
            for account in &data.accounts {
                tx.execute(
                    "INSERT INTO player (id, username, coin, diamond) VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(id) DO UPDATE SET username = excluded.username, \
                     coin = excluded.coin, diamond = excluded.diamond",
                    params![
                        account.player.id,
                        account.player.username,
                        account.wallet.coin,
                        account.wallet.diamond
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

impl Catalogue for SqliteStore {
    async fn claw_machine(&self, machine_id: i64) -> Result<Option<ClawMachine>, StoreError> {
        self.with_conn(move |conn| {
            let header = conn
                .query_row(
                    "SELECT id, name, price, max_item FROM claw_machine WHERE id = ?1",
                    params![machine_id],
                    |row| {
                        Ok(ClawMachine {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            price: row.get(2)?,
                            max_item: row.get(3)?,
                            items: Vec::new(),
                        })
                    },
                )
                .optional()?;
            let Some(mut machine) = header else {
                return Ok(None);
            };
            machine.items = machine_items(conn, CLAW_ITEMS, machine_id)?;
            Ok(Some(machine))
        })
        .await
    }

    async fn gacha_machine(&self, machine_id: i64) -> Result<Option<GachaMachine>, StoreError> {
        self.with_conn(move |conn| {
            let header = conn
                .query_row(
                    "SELECT id, name, price, price_times_ten, super_rare_pity, ultra_rare_pity \
                     FROM gacha_machine WHERE id = ?1",
                    params![machine_id],
                    |row| {
                        Ok(GachaMachine {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            price: row.get(2)?,
                            price_times_ten: row.get(3)?,
                            super_rare_pity: row.get(4)?,
                            ultra_rare_pity: row.get(5)?,
                            items: Vec::new(),
                        })
                    },
                )
                .optional()?;
            let Some(mut machine) = header else {
                return Ok(None);
            };
            machine.items = machine_items(conn, GACHA_ITEMS, machine_id)?;
            Ok(Some(machine))
        })
        .await
    }

    async fn mole_weights(&self) -> Result<Vec<MoleWeight>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, mole_type, weight FROM whackamole_mole_weight ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(MoleWeight {
                    id: row.get(0)?,
                    mole_type: row.get(1)?,
                    weight: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<Result<_, _>>()?)
        })
        .await
    }
}

impl Wallet for SqliteStore {
    async fn account(&self, player_id: i64) -> Result<Option<Account>, StoreError> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, username, coin, diamond FROM player WHERE id = ?1",
                    params![player_id],
                    |row| {
                        Ok(Account {
                            player: Player {
                                id: row.get(0)?,
                                username: row.get(1)?,
                            },
                            wallet: Balance {
                                coin: row.get(2)?,
                                diamond: row.get(3)?,
                            },
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    async fn adjust_coin(&self, player_id: i64, delta: i64) -> Result<i64, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "UPDATE player SET coin = coin + ?2 WHERE id = ?1 RETURNING coin",
                params![player_id, delta],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "player",
                id: player_id,
            })
        })
        .await
    }

    /// Conditional single-statement debit; the balance never goes negative.
    async fn debit_coin(&self, player_id: i64, amount: i64) -> Result<Debit, StoreError> {
        self.with_conn(move |conn| {
            let charged: Option<i64> = conn
                .query_row(
                    "UPDATE player SET coin = coin - ?2 WHERE id = ?1 AND coin >= ?2 \
                     RETURNING coin",
                    params![player_id, amount],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(balance) = charged {
                return Ok(Debit::Charged { balance });
            }
            let balance: Option<i64> = conn
                .query_row(
                    "SELECT coin FROM player WHERE id = ?1",
                    params![player_id],
                    |row| row.get(0),
                )
                .optional()?;
            balance
                .map(|balance| Debit::Insufficient { balance })
                .ok_or(StoreError::NotFound {
                    entity: "player",
                    id: player_id,
                })
        })
        .await
    }
}

impl History for SqliteStore {
    async fn create_claw_game(&self, header: ClawMachineGameRecord) -> Result<i64, StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO claw_machine_game_record (claw_machine_id, player_id, success) \
                 VALUES (?1, ?2, ?3)",
                params![header.claw_machine_id, header.player_id, header.success],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn append_touched_item(
        &self,
        game_id: i64,
        record: TouchedItemRecord,
    ) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE claw_machine_game_record SET success = success OR ?2 WHERE id = ?1",
                params![game_id, record.catched],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound {
                    entity: "claw game",
                    id: game_id,
                });
            }
            tx.execute(
                "INSERT INTO claw_touched_item (game_id, item_id, catched) VALUES (?1, ?2, ?3)",
                params![game_id, record.item_id, record.catched],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn claw_game(&self, game_id: i64) -> Result<Option<ClawMachineGameRecord>, StoreError> {
        self.with_conn(move |conn| claw_game(conn, game_id)).await
    }

    async fn claw_games_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<ClawMachineGameRecord>, StoreError> {
        self.with_conn(move |conn| {
            let ids: Vec<i64> = {
                let mut stmt = conn.prepare_cached(
                    "SELECT id FROM claw_machine_game_record WHERE player_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![player_id], |row| row.get(0))?;
                rows.collect::<Result<_, _>>()?
            };
            let mut games = Vec::with_capacity(ids.len());
            for game_id in ids {
                if let Some(game) = claw_game(conn, game_id)? {
                    games.push(game);
                }
            }
            Ok(games)
        })
        .await
    }

    async fn record_pull_batch(
        &self,
        source: &str,
        session: GachaPullSession,
        item_ids: &[i64],
    ) -> Result<i64, StoreError> {
        let source = source.to_string();
        let item_ids = item_ids.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM gacha_pull_session WHERE source_entry_id = ?1",
                    params![source],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(session_id) = existing {
                return Ok(session_id);
            }

            tx.execute(
                "INSERT INTO gacha_pull_session \
                 (source_entry_id, gacha_machine_id, player_id, pull_count) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    source,
                    session.gacha_machine_id,
                    session.player_id,
                    session.pull_count
                ],
            )?;
            let session_id = tx.last_insert_rowid();
            {
                let mut insert = tx.prepare_cached(
                    "INSERT INTO gacha_pull_history (session_id, item_id) VALUES (?1, ?2)",
                )?;
                for item_id in &item_ids {
                    insert.execute(params![session_id, item_id])?;
                }
            }
            tx.commit()?;
            Ok(session_id)
        })
        .await
    }

    async fn pull_sessions(&self, player_id: i64) -> Result<Vec<GachaPullSession>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, gacha_machine_id, player_id, pull_count FROM gacha_pull_session \
                 WHERE player_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![player_id], |row| {
                Ok(GachaPullSession {
                    id: row.get(0)?,
                    gacha_machine_id: row.get(1)?,
                    player_id: row.get(2)?,
                    pull_count: row.get(3)?,
                })
            })?;
            Ok(rows.collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn pull_histories(&self, session_id: i64) -> Result<Vec<GachaPullHistory>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, session_id, item_id FROM gacha_pull_history \
                 WHERE session_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                Ok(GachaPullHistory {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    item_id: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<Result<_, _>>()?)
        })
        .await
    }
}

impl PityStore for SqliteStore {
    async fn load_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> Result<Option<GachaPityState>, StoreError> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT super_rare_pity_count, ultra_rare_pity_count FROM gacha_pity_state \
                     WHERE machine_id = ?1 AND player_id = ?2",
                    params![machine_id, player_id],
                    |row| {
                        Ok(GachaPityState {
                            player_id,
                            machine_id,
                            super_rare_pity_count: row.get(0)?,
                            ultra_rare_pity_count: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    async fn save_pity(&self, state: GachaPityState) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO gacha_pity_state \
                 (machine_id, player_id, super_rare_pity_count, ultra_rare_pity_count) \
                 VALUES (?1, ?2, ?3, ?4) ON CONFLICT(machine_id, player_id) DO UPDATE SET \
                 super_rare_pity_count = excluded.super_rare_pity_count, \
                 ultra_rare_pity_count = excluded.ultra_rare_pity_count",
                params![
                    state.machine_id,
                    state.player_id,
                    state.super_rare_pity_count,
                    state.ultra_rare_pity_count
                ],
            )?;
            Ok(())
        })
        .await
    }
}

fn leaderboard_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LeaderboardRow> {
    Ok(LeaderboardRow {
        player_id: row.get(0)?,
        username: row.get(1)?,
        score: row.get(2)?,
        rank: row.get(3)?,
    })
}

impl LeaderboardStore for SqliteStore {
    async fn leaderboard_row(&self, player_id: i64) -> Result<Option<LeaderboardRow>, StoreError> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT player_id, username, score, \"rank\" FROM whackamole_leaderboard \
                     WHERE player_id = ?1",
                    params![player_id],
                    leaderboard_row,
                )
                .optional()?)
        })
        .await
    }

    async fn raise_score(
        &self,
        player_id: i64,
        username: &str,
        score: i64,
    ) -> Result<bool, StoreError> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "INSERT INTO whackamole_leaderboard (player_id, username, score, \"rank\") \
                 VALUES (?1, ?2, ?3, 0) ON CONFLICT(player_id) DO UPDATE SET \
                 score = excluded.score, username = excluded.username \
                 WHERE excluded.score > whackamole_leaderboard.score",
                params![player_id, username, score],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn top_ranked(&self, limit: usize) -> Result<Vec<LeaderboardRow>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT player_id, username, score, \"rank\" FROM whackamole_leaderboard \
                 WHERE \"rank\" > 0 ORDER BY \"rank\" ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], leaderboard_row)?;
            Ok(rows.collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn materialise(&self, rank_limit: usize) -> Result<usize, StoreError> {
        let rank_limit = i64::try_from(rank_limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("UPDATE whackamole_leaderboard SET \"rank\" = 0", [])?;
            let ranked = tx.execute(
                "UPDATE whackamole_leaderboard SET \"rank\" = ranked.position \
                 FROM (SELECT player_id, ROW_NUMBER() OVER \
                     (ORDER BY score DESC, player_id ASC) AS position \
                     FROM whackamole_leaderboard) AS ranked \
                 WHERE whackamole_leaderboard.player_id = ranked.player_id \
                 AND ranked.position <= ?1",
                params![rank_limit],
            )?;
            tx.commit()?;
            Ok(ranked)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_execution::mocks;
    use tempfile::TempDir;

    async fn seeded() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("arcade.db")).unwrap();
        store
            .seed(&SeedData {
                claw_machines: vec![mocks::claw_machine()],
                gacha_machines: vec![mocks::gacha_machine()],
                mole_weights: mocks::mole_weights(),
                accounts: vec![Account::new(7, "ada", 150), Account::new(8, "grace", 0)],
            })
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn catalogue_round_trips_through_seed() {
        let (store, _dir) = seeded().await;

        let claw = store.claw_machine(1).await.unwrap().unwrap();
        assert_eq!(claw, mocks::claw_machine());
        let gacha = store.gacha_machine(2).await.unwrap().unwrap();
        assert_eq!(gacha, mocks::gacha_machine());
        assert_eq!(store.mole_weights().await.unwrap(), mocks::mole_weights());
        assert!(store.claw_machine(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reseeding_replaces_machine_items() {
        let (store, _dir) = seeded().await;
        let mut claw = mocks::claw_machine();
        claw.items.truncate(2);
        store
            .seed(&SeedData {
                claw_machines: vec![claw],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.claw_machine(1).await.unwrap().unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn conditional_debit_never_overdraws() {
        let (store, _dir) = seeded().await;

        assert_eq!(
            store.debit_coin(7, 100).await.unwrap(),
            Debit::Charged { balance: 50 }
        );
        assert_eq!(
            store.debit_coin(7, 100).await.unwrap(),
            Debit::Insufficient { balance: 50 }
        );
        assert_eq!(store.account(7).await.unwrap().unwrap().wallet.coin, 50);
        assert!(matches!(
            store.debit_coin(99, 1).await,
            Err(StoreError::NotFound { entity: "player", id: 99 })
        ));
        assert_eq!(store.adjust_coin(8, 25).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn claw_history_accumulates_touches() {
        let (store, _dir) = seeded().await;
        let game_id = store
            .create_claw_game(ClawMachineGameRecord::header(1, 7))
            .await
            .unwrap();
        store
            .append_touched_item(game_id, TouchedItemRecord { item_id: 101, catched: false })
            .await
            .unwrap();
        store
            .append_touched_item(game_id, TouchedItemRecord { item_id: 103, catched: true })
            .await
            .unwrap();

        let game = store.claw_game(game_id).await.unwrap().unwrap();
        assert!(game.success);
        assert_eq!(game.item_records.len(), 2);
        assert_eq!(store.claw_games_for_player(7).await.unwrap(), vec![game]);
        assert!(matches!(
            store
                .append_touched_item(game_id + 1, TouchedItemRecord { item_id: 1, catched: true })
                .await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn pull_batch_is_idempotent_per_entry() {
        let (store, _dir) = seeded().await;
        let session = GachaPullSession {
            id: 0,
            gacha_machine_id: 2,
            player_id: 7,
            pull_count: 10,
        };
        let items: Vec<i64> = (201..=207).chain(201..=203).collect();

        let first = store.record_pull_batch("1-0", session, &items).await.unwrap();
        let again = store.record_pull_batch("1-0", session, &items).await.unwrap();
        assert_eq!(first, again);

        let sessions = store.pull_sessions(7).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, first);
        let histories = store.pull_histories(first).await.unwrap();
        assert_eq!(
            histories.iter().map(|h| h.item_id).collect::<Vec<_>>(),
            items
        );
    }

    #[tokio::test]
    async fn pity_upserts() {
        let (store, _dir) = seeded().await;
        assert!(store.load_pity(2, 7).await.unwrap().is_none());
        let mut state = GachaPityState::fresh(2, 7);
        state.ultra_rare_pity_count = 45;
        store.save_pity(state).await.unwrap();
        state.super_rare_pity_count = 3;
        store.save_pity(state).await.unwrap();
        assert_eq!(store.load_pity(2, 7).await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn leaderboard_ranks_and_ties() {
        let (store, _dir) = seeded().await;
        assert!(store.raise_score(1, "a", 100).await.unwrap());
        assert!(store.raise_score(2, "b", 100).await.unwrap());
        assert!(store.raise_score(3, "c", 50).await.unwrap());
        assert!(!store.raise_score(3, "c", 50).await.unwrap());
        assert!(!store.raise_score(1, "a", 10).await.unwrap());

        assert_eq!(store.materialise(100).await.unwrap(), 3);
        let ranks: Vec<_> = store
            .top_ranked(10)
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.player_id, row.rank))
            .collect();
        assert_eq!(ranks, vec![(1, 1), (2, 2), (3, 3)]);

        assert!(store.raise_score(4, "d", 0).await.unwrap());
        assert_eq!(store.leaderboard_row(4).await.unwrap().unwrap().rank, 0);
    }

    #[tokio::test]
    async fn materialise_caps_ranked_rows() {
        let (store, _dir) = seeded().await;
        for player_id in 1..=150 {
            store
                .raise_score(player_id, &format!("p{player_id}"), player_id)
                .await
                .unwrap();
        }
        assert_eq!(store.materialise(100).await.unwrap(), 100);
        assert_eq!(store.leaderboard_row(150).await.unwrap().unwrap().rank, 1);
        assert_eq!(store.leaderboard_row(51).await.unwrap().unwrap().rank, 100);
        assert_eq!(store.leaderboard_row(50).await.unwrap().unwrap().rank, 0);
        assert_eq!(store.top_ranked(10).await.unwrap().len(), 10);
    }
}
