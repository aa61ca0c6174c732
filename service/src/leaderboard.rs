use arcade_types::{LeaderboardRow, LEADERBOARD_PAGE_SIZE};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{info, warn};

use crate::{store::LeaderboardStore, SessionError, StoreError};

/// A player's view of the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standings {
    pub top_players: Vec<LeaderboardRow>,
    /// 0 when the player is unranked or has no row.
    pub your_rank: i32,
    pub your_score: i64,
}

pub struct LeaderboardService<S> {
    store: Arc<S>,
}

impl<S> Clone for LeaderboardService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LeaderboardStore> LeaderboardService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records a score. Ranks are left for the next materialisation.
    pub async fn submit_score(
        &self,
        player_id: i64,
        username: &str,
        score: i64,
    ) -> Result<(), SessionError> {
        if self.store.raise_score(player_id, username, score).await? {
            Ok(())
        } else {
            Err(SessionError::ScoreNotImproved { proposed: score })
        }
    }

    pub async fn standings(&self, player_id: i64) -> Result<Standings, SessionError> {
        let top_players = self.store.top_ranked(LEADERBOARD_PAGE_SIZE).await?;
        let row = self.store.leaderboard_row(player_id).await?;
        Ok(Standings {
            top_players,
            your_rank: row.as_ref().map_or(0, |row| row.rank),
            your_score: row.map_or(0, |row| row.score),
        })
    }
}

/// Periodic rank recomputation.
pub struct LeaderboardMaterialiser<S> {
    store: Arc<S>,
    rank_limit: usize,
}

impl<S: LeaderboardStore> LeaderboardMaterialiser<S> {
    pub fn new(store: Arc<S>, rank_limit: usize) -> Self {
        Self { store, rank_limit }
    }

    /// One pass. Returns the number of ranked rows.
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        self.store.materialise(self.rank_limit).await
    }

    /// Runs a pass every `period` until `shutdown` flips or its sender goes away.
    ///
    /// A pass in progress always completes; failures wait for the next tick.
    pub async fn run(self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?period, rank_limit = self.rank_limit, "leaderboard materialiser started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            match self.run_once().await {
                Ok(ranked) => info!(ranked, "leaderboard materialised"),
                Err(err) => warn!(?err, "leaderboard materialisation failed"),
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("leaderboard materialiser stopped");
    }
}
