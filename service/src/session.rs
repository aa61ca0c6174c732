//! Per-request game orchestration.

use arcade_execution::{pre_roll, pull_once, spawn_for_machine, Sampler};
use arcade_types::{
    Account, ClawMachine, ClawMachineGameRecord, GachaEvent, GachaMachine, GachaPullSession,
    MoleWeight, TouchedItemRecord, Verdict,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::{
    leaderboard::{LeaderboardService, Standings},
    pity::PityManager,
    store::{Cache, Debit, EventStream, Store},
    SessionError,
};

/// Result of starting a claw game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClawStart {
    pub game_id: i64,
    pub verdicts: Vec<Verdict>,
}

fn require_id(name: &str, id: i64) -> Result<(), SessionError> {
    if id <= 0 {
        return Err(SessionError::InvalidRequest(format!("{name} must be positive")));
    }
    Ok(())
}

/// Handles game requests against a durable store, a cache, and an event stream.
pub struct Orchestrator<S, C, E> {
    store: Arc<S>,
    cache: Arc<C>,
    stream: Arc<E>,
    sampler: Arc<Sampler>,
    pity: PityManager<S, C>,
    leaderboard: LeaderboardService<S>,
    verdict_ttl: Duration,
}

impl<S: Store, C: Cache, E: EventStream> Orchestrator<S, C, E> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        stream: Arc<E>,
        sampler: Arc<Sampler>,
        verdict_ttl: Duration,
    ) -> Self {
        Self {
            pity: PityManager::new(Arc::clone(&store), Arc::clone(&cache)),
            leaderboard: LeaderboardService::new(Arc::clone(&store)),
            store,
            cache,
            stream,
            sampler,
            verdict_ttl,
        }
    }

    async fn charge(&self, player_id: i64, price: i64) -> Result<i64, SessionError> {
        match self.store.debit_coin(player_id, price).await? {
            Debit::Charged { balance } => Ok(balance),
            Debit::Insufficient { balance } => {
                info!(player_id, price, balance, "insufficient funds");
                Err(SessionError::InsufficientFunds { balance, price })
            }
        }
    }

    async fn refund(&self, player_id: i64, amount: i64) {
        if let Err(err) = self.store.adjust_coin(player_id, amount).await {
            error!(player_id, amount, ?err, "failed to refund player");
        }
    }

    async fn claw_machine(&self, machine_id: i64) -> Result<ClawMachine, SessionError> {
        require_id("machine_id", machine_id)?;
        self.store
            .claw_machine(machine_id)
            .await?
            .ok_or(SessionError::NotFound {
                entity: "claw machine",
                id: machine_id,
            })
    }

    async fn gacha_machine(&self, machine_id: i64) -> Result<GachaMachine, SessionError> {
        require_id("machine_id", machine_id)?;
        self.store
            .gacha_machine(machine_id)
            .await?
            .ok_or(SessionError::NotFound {
                entity: "gacha machine",
                id: machine_id,
            })
    }

    /// Charges the machine price, opens a game record, and pre-rolls a verdict for
    /// every machine item.
    ///
    /// Verdicts are cached for later reconciliation; a failed cache write is logged and
    /// the verdicts are still returned.
    pub async fn start_claw_game(
        &self,
        player_id: i64,
        machine_id: i64,
    ) -> Result<ClawStart, SessionError> {
        require_id("player_id", player_id)?;
        let machine = self.claw_machine(machine_id).await?;
        machine.validate()?;

        let spawned = spawn_for_machine(&self.sampler, &machine);
        debug!(machine_id, ?spawned, "spawned claw items");
        let verdicts = pre_roll(&self.sampler, &machine)?;

        self.charge(player_id, machine.price).await?;
        let game_id = match self
            .store
            .create_claw_game(ClawMachineGameRecord::header(machine_id, player_id))
            .await
        {
            Ok(game_id) => game_id,
            Err(err) => {
                self.refund(player_id, machine.price).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self
            .cache
            .put_verdicts(game_id, &verdicts, self.verdict_ttl)
            .await
        {
            warn!(game_id, ?err, "failed to cache claw verdicts");
        }
        info!(game_id, player_id, machine_id, "claw game started");
        Ok(ClawStart { game_id, verdicts })
    }

    /// Checks a client-reported catch against the cached verdict and records it.
    ///
    /// The verdict list is dropped after the first report, matching or not.
    pub async fn add_touched_item(
        &self,
        game_id: i64,
        item_id: i64,
        catched: bool,
    ) -> Result<(), SessionError> {
        require_id("game_id", game_id)?;
        let verdicts = self
            .cache
            .get_verdicts(game_id)
            .await?
            .ok_or(SessionError::ResultExpired { game_id })?;
        let verdict = verdicts
            .iter()
            .find(|verdict| verdict.item_id == item_id)
            .ok_or(SessionError::UnknownItem { game_id, item_id })?;

        if verdict.success != catched {
            warn!(game_id, item_id, catched, "reported catch disagrees with verdict");
            if let Err(err) = self.cache.delete_verdicts(game_id).await {
                warn!(game_id, ?err, "failed to drop claw verdicts");
            }
            return Err(SessionError::VerdictMismatch { game_id, item_id });
        }

        self.store
            .append_touched_item(game_id, TouchedItemRecord { item_id, catched })
            .await?;
        if let Err(err) = self.cache.delete_verdicts(game_id).await {
            warn!(game_id, ?err, "failed to drop claw verdicts");
        }
        Ok(())
    }

    /// Spawn list for the physical machine display.
    pub async fn spawn_items(&self, machine_id: i64) -> Result<Vec<i64>, SessionError> {
        let machine = self.claw_machine(machine_id).await?;
        Ok(spawn_for_machine(&self.sampler, &machine))
    }

    /// Charges for `pull_count` pulls and resolves them in order.
    ///
    /// Pity counters are staged after every pull and committed once at the end; a
    /// failed commit refunds the charge. The pulled ids are published as one event; a
    /// failed publish is logged.
    pub async fn pull(
        &self,
        player_id: i64,
        machine_id: i64,
        pull_count: i32,
    ) -> Result<Vec<i64>, SessionError> {
        require_id("player_id", player_id)?;
        let machine = self.gacha_machine(machine_id).await?;
        let price = machine.price_for(pull_count).ok_or_else(|| {
            SessionError::InvalidRequest(format!("unsupported pull count {pull_count}"))
        })?;
        machine.validate()?;

        let mut pity = self.pity.load(machine_id, player_id).await?;
        self.charge(player_id, price).await?;

        let mut item_ids = Vec::with_capacity(pull_count as usize);
        for _ in 0..pull_count {
            let outcome = pull_once(&self.sampler, &machine, &pity)?;
            if outcome.fell_back {
                warn!(
                    machine_id,
                    bucket = ?outcome.bucket,
                    "forced rarity bucket is empty, pulled from every item"
                );
            }
            pity = outcome.pity;
            self.pity.stage(&pity).await;
            item_ids.push(outcome.item_id);
        }
        if let Err(err) = self.pity.commit(&pity).await {
            error!(player_id, machine_id, ?err, "failed to commit pity counters, refunding");
            self.pity.discard(machine_id, player_id).await;
            self.refund(player_id, price).await;
            return Err(err.into());
        }

        let event = GachaEvent {
            session: GachaPullSession {
                id: 0,
                gacha_machine_id: machine_id,
                player_id,
                pull_count,
            },
            item_ids: item_ids.clone(),
        };
        match event.to_json() {
            Ok(data) => {
                if let Err(err) = self.stream.publish(data).await {
                    error!(player_id, machine_id, ?err, "failed to publish gacha event");
                }
            }
            Err(err) => error!(player_id, machine_id, %err, "failed to encode gacha event"),
        }
        info!(player_id, machine_id, pull_count, "gacha pulls resolved");
        Ok(item_ids)
    }

    pub async fn player(&self, player_id: i64) -> Result<Account, SessionError> {
        require_id("player_id", player_id)?;
        self.store
            .account(player_id)
            .await?
            .ok_or(SessionError::NotFound {
                entity: "player",
                id: player_id,
            })
    }

    pub async fn claw_machine_info(&self, machine_id: i64) -> Result<ClawMachine, SessionError> {
        self.claw_machine(machine_id).await
    }

    pub async fn gacha_machine_info(&self, machine_id: i64) -> Result<GachaMachine, SessionError> {
        self.gacha_machine(machine_id).await
    }

    pub async fn mole_weights(&self) -> Result<Vec<MoleWeight>, SessionError> {
        Ok(self.store.mole_weights().await?)
    }

    pub async fn standings(&self, player_id: i64) -> Result<Standings, SessionError> {
        require_id("player_id", player_id)?;
        self.leaderboard.standings(player_id).await
    }

    /// Records a whack-a-mole score if it beats the player's best.
    pub async fn update_score(&self, player_id: i64, score: i64) -> Result<(), SessionError> {
        let account = self.player(player_id).await?;
        self.leaderboard
            .submit_score(player_id, &account.player.username, score)
            .await
    }
}
