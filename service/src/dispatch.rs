//! Routes client envelopes to the orchestrator and wraps replies.

use arcade_types::{
    Ack, AddTouchedItemRecordReq, AddTouchedItemRecordResp, CatchResult, ClawItemInfo, Envelope,
    GachaItemInfo, GetClawMachineInfoReq, GetClawMachineInfoResp, GetGachaMachineInfoReq,
    GetGachaMachineInfoResp, GetLeaderboardReq, GetLeaderboardResp, GetMoleWeightReq,
    GetMoleWeightResp, GetPlayerInfoWsReq, GetPlayerInfoWsResp, GetPullResultWsReq,
    GetPullResultWsResp, ItemIds, LeaderboardEntry, Message, MessageType, MoleInfo, SpawnItemReq,
    SpawnItemResp, StartClawGameReq, StartClawGameResp, UpdateScoreReq, UpdateScoreResp,
};
use tracing::{debug, warn};

use crate::{
    session::Orchestrator,
    store::{Cache, EventStream, Store},
    SessionError,
};

fn decode<M: Message>(request: &Envelope) -> Result<M, SessionError> {
    request
        .open::<M>()
        .map_err(|err| SessionError::InvalidRequest(format!("malformed {:?}: {err}", M::TYPE)))
}

fn local_id(name: &str, id: u64) -> Result<i64, SessionError> {
    i64::try_from(id).map_err(|_| SessionError::InvalidRequest(format!("{name} out of range")))
}

fn wire_id(id: i64) -> u64 {
    u64::try_from(id).unwrap_or_default()
}

fn wire_ids(ids: impl IntoIterator<Item = i64>) -> ItemIds {
    ItemIds(ids.into_iter().map(wire_id).collect())
}

/// Handles one request envelope and returns the reply envelope.
///
/// Failures become an `ErrorResp` carrying the error's code; a tag outside the
/// closed set yields code 400 "Unknown message type".
pub async fn dispatch<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Envelope {
    let kind = match request.kind() {
        Ok(kind) => kind,
        Err(err) => {
            debug!(%err, "rejecting envelope");
            return Envelope::unknown_message_type();
        }
    };

    let reply = match kind {
        MessageType::StartClawGameReq => start_claw_game(orchestrator, request).await,
        MessageType::AddTouchedItemRecordReq => add_touched_item(orchestrator, request).await,
        MessageType::SpawnItemReq => spawn_items(orchestrator, request).await,
        MessageType::GetPullResultWsReq => pull(orchestrator, request).await,
        MessageType::GetPlayerInfoWsReq => player_info(orchestrator, request).await,
        MessageType::GetClawMachineInfoReq => claw_machine_info(orchestrator, request).await,
        MessageType::GetGachaMachineInfoReq => gacha_machine_info(orchestrator, request).await,
        MessageType::GetLeaderboardReq => leaderboard(orchestrator, request).await,
        MessageType::UpdateScoreReq => update_score(orchestrator, request).await,
        MessageType::GetMoleWeightReq => mole_weights(orchestrator, request).await,
        other => Err(SessionError::InvalidRequest(format!(
            "{other:?} is not a request"
        ))),
    };

    reply.unwrap_or_else(|err| {
        match &err {
            SessionError::Config(_) | SessionError::StoreUnavailable(_) => {
                warn!(?kind, %err, "request failed")
            }
            _ => debug!(?kind, %err, "request rejected"),
        }
        err.to_envelope()
    })
}

async fn start_claw_game<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let req: StartClawGameReq = decode(request)?;
    let start = orchestrator
        .start_claw_game(
            local_id("player_id", req.player_id)?,
            local_id("machine_id", req.machine_id)?,
        )
        .await?;
    Ok(Envelope::wrap(&StartClawGameResp {
        game_id: wire_id(start.game_id),
        results: start
            .verdicts
            .iter()
            .map(|verdict| CatchResult {
                item_id: wire_id(verdict.item_id),
                catched: verdict.success,
            })
            .collect(),
    }))
}

async fn add_touched_item<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let req: AddTouchedItemRecordReq = decode(request)?;
    orchestrator
        .add_touched_item(
            local_id("game_id", req.game_id)?,
            local_id("item_id", req.item_id)?,
            req.catched,
        )
        .await?;
    Ok(Envelope::wrap(&AddTouchedItemRecordResp(Ack { success: true })))
}

async fn spawn_items<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let SpawnItemReq(machine) = decode(request)?;
    let spawned = orchestrator
        .spawn_items(local_id("machine_id", machine.machine_id)?)
        .await?;
    Ok(Envelope::wrap(&SpawnItemResp(wire_ids(spawned))))
}

async fn pull<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let req: GetPullResultWsReq = decode(request)?;
    let pulled = orchestrator
        .pull(
            local_id("player_id", req.player_id)?,
            local_id("machine_id", req.machine_id)?,
            req.pull_count,
        )
        .await?;
    Ok(Envelope::wrap(&GetPullResultWsResp(wire_ids(pulled))))
}

async fn player_info<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let GetPlayerInfoWsReq(player) = decode(request)?;
    let account = orchestrator
        .player(local_id("player_id", player.player_id)?)
        .await?;
    Ok(Envelope::wrap(&GetPlayerInfoWsResp {
        player_id: wire_id(account.player.id),
        username: account.player.username,
        coin: account.wallet.coin,
        diamond: account.wallet.diamond,
    }))
}

async fn claw_machine_info<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let GetClawMachineInfoReq(machine) = decode(request)?;
    let machine = orchestrator
        .claw_machine_info(local_id("machine_id", machine.machine_id)?)
        .await?;
    Ok(Envelope::wrap(&GetClawMachineInfoResp {
        machine_id: wire_id(machine.id),
        name: machine.name,
        price: machine.price,
        max_item: machine.max_item,
        items: machine
            .items
            .into_iter()
            .map(|slot| ClawItemInfo {
                item_id: wire_id(slot.item.id),
                rarity: slot.item.rarity.to_string(),
                name: slot.item.name,
                spawn_percentage: slot.item.spawn_percentage,
                catch_percentage: slot.item.catch_percentage,
                max_item_spawned: slot.item.max_item_spawned,
            })
            .collect(),
    }))
}

async fn gacha_machine_info<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let GetGachaMachineInfoReq(machine) = decode(request)?;
    let machine = orchestrator
        .gacha_machine_info(local_id("machine_id", machine.machine_id)?)
        .await?;
    Ok(Envelope::wrap(&GetGachaMachineInfoResp {
        machine_id: wire_id(machine.id),
        name: machine.name,
        price: machine.price,
        price_times_ten: machine.price_times_ten,
        super_rare_pity: machine.super_rare_pity,
        ultra_rare_pity: machine.ultra_rare_pity,
        items: machine
            .items
            .into_iter()
            .map(|slot| GachaItemInfo {
                item_id: wire_id(slot.item.id),
                rarity: slot.item.rarity.to_string(),
                name: slot.item.name,
                pull_weight: slot.item.pull_weight,
            })
            .collect(),
    }))
}

async fn leaderboard<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let GetLeaderboardReq(player) = decode(request)?;
    let standings = orchestrator
        .standings(local_id("player_id", player.player_id)?)
        .await?;
    Ok(Envelope::wrap(&GetLeaderboardResp {
        top_players: standings
            .top_players
            .into_iter()
            .map(|row| LeaderboardEntry {
                rank: row.rank,
                player_id: wire_id(row.player_id),
                username: row.username,
                score: row.score,
            })
            .collect(),
        your_rank: standings.your_rank,
        your_score: standings.your_score,
    }))
}

async fn update_score<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    let req: UpdateScoreReq = decode(request)?;
    orchestrator
        .update_score(local_id("player_id", req.player_id)?, req.score)
        .await?;
    Ok(Envelope::wrap(&UpdateScoreResp(Ack { success: true })))
}

async fn mole_weights<S: Store, C: Cache, E: EventStream>(
    orchestrator: &Orchestrator<S, C, E>,
    request: &Envelope,
) -> Result<Envelope, SessionError> {
    decode::<GetMoleWeightReq>(request)?;
    let moles = orchestrator.mole_weights().await?;
    Ok(Envelope::wrap(&GetMoleWeightResp {
        moles: moles
            .into_iter()
            .map(|mole| MoleInfo {
                mole_type: mole.mole_type,
                weight: mole.weight,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryCache, MemoryStore, MemoryStream};
    use arcade_execution::{mocks, Sampler};
    use arcade_types::{Account, ErrorResp, MachineRef, PlayerRef, CODE_BAD_REQUEST};
    use std::{sync::Arc, time::Duration};

    fn orchestrator() -> Orchestrator<MemoryStore, MemoryCache, MemoryStream> {
        let store = MemoryStore::new();
        store.insert_claw_machine(mocks::claw_machine());
        store.insert_gacha_machine(mocks::gacha_machine());
        for weight in mocks::mole_weights() {
            store.insert_mole_weight(weight);
        }
        store.insert_account(Account::new(7, "ada", 1_000));
        Orchestrator::new(
            Arc::new(store),
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryStream::new()),
            Arc::new(Sampler::seeded(11)),
            Duration::from_secs(300),
        )
    }

    fn error_of(reply: &Envelope) -> ErrorResp {
        reply.open::<ErrorResp>().unwrap()
    }

    #[tokio::test]
    async fn unknown_tag_is_bad_request() {
        let orchestrator = orchestrator();
        let reply = dispatch(
            &orchestrator,
            &Envelope {
                message_type: 999,
                payload: Vec::new(),
            },
        )
        .await;
        let err = error_of(&reply);
        assert_eq!(err.code, CODE_BAD_REQUEST);
        assert_eq!(err.message, "Unknown message type");
    }

    #[tokio::test]
    async fn response_tag_is_rejected() {
        let orchestrator = orchestrator();
        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&UpdateScoreResp(Ack { success: true })),
        )
        .await;
        assert_eq!(error_of(&reply).code, CODE_BAD_REQUEST);
    }

    #[tokio::test]
    async fn truncated_payload_is_bad_request() {
        let orchestrator = orchestrator();
        let reply = dispatch(
            &orchestrator,
            &Envelope {
                message_type: MessageType::StartClawGameReq as u16,
                payload: vec![0, 0, 0],
            },
        )
        .await;
        assert_eq!(error_of(&reply).code, CODE_BAD_REQUEST);
    }

    #[tokio::test]
    async fn claw_round_trip_over_envelopes() {
        let orchestrator = orchestrator();
        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&StartClawGameReq {
                player_id: 7,
                machine_id: 1,
            }),
        )
        .await;
        let started: StartClawGameResp = reply.open().unwrap();
        assert_eq!(started.results.len(), 4);

        let first = &started.results[0];
        let report = Envelope::wrap(&AddTouchedItemRecordReq {
            game_id: started.game_id,
            item_id: first.item_id,
            catched: first.catched,
        });
        let ack: AddTouchedItemRecordResp = dispatch(&orchestrator, &report).await.open().unwrap();
        assert!(ack.0.success);

        // The verdict list is single-use.
        let reply = dispatch(&orchestrator, &report).await;
        assert_eq!(error_of(&reply).code, arcade_types::CODE_RESULT_EXPIRED);
    }

    #[tokio::test]
    async fn ten_pull_returns_ten_ids() {
        let orchestrator = orchestrator();
        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&GetPullResultWsReq {
                player_id: 7,
                machine_id: 2,
                pull_count: 10,
            }),
        )
        .await;
        let GetPullResultWsResp(ItemIds(ids)) = reply.open().unwrap();
        assert_eq!(ids.len(), 10);
        assert!(ids.iter().all(|id| (201..=207).contains(id)));
    }

    #[tokio::test]
    async fn unsupported_pull_count_is_bad_request() {
        let orchestrator = orchestrator();
        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&GetPullResultWsReq {
                player_id: 7,
                machine_id: 2,
                pull_count: 3,
            }),
        )
        .await;
        assert_eq!(error_of(&reply).code, CODE_BAD_REQUEST);
    }

    #[tokio::test]
    async fn snapshots_mirror_the_catalogue() {
        let orchestrator = orchestrator();

        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&GetPlayerInfoWsReq(PlayerRef { player_id: 7 })),
        )
        .await;
        let player: GetPlayerInfoWsResp = reply.open().unwrap();
        assert_eq!(player.username, "ada");
        assert_eq!(player.coin, 1_000);

        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&GetClawMachineInfoReq(MachineRef { machine_id: 1 })),
        )
        .await;
        let claw: GetClawMachineInfoResp = reply.open().unwrap();
        assert_eq!(claw.price, 100);
        assert_eq!(claw.items[2].rarity, "rare");

        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&GetGachaMachineInfoReq(MachineRef { machine_id: 2 })),
        )
        .await;
        let gacha: GetGachaMachineInfoResp = reply.open().unwrap();
        assert_eq!(gacha.ultra_rare_pity, 90);
        assert_eq!(gacha.items.len(), 7);

        let reply = dispatch(&orchestrator, &Envelope::wrap(&GetMoleWeightReq)).await;
        let moles: GetMoleWeightResp = reply.open().unwrap();
        assert_eq!(moles.moles.len(), 3);

        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&SpawnItemReq(MachineRef { machine_id: 1 })),
        )
        .await;
        let SpawnItemResp(ItemIds(spawned)) = reply.open().unwrap();
        assert!(spawned.len() <= 6);
    }

    #[tokio::test]
    async fn score_updates_are_monotone() {
        let orchestrator = orchestrator();
        let submit = |score| {
            Envelope::wrap(&UpdateScoreReq {
                player_id: 7,
                score,
            })
        };

        let reply = dispatch(&orchestrator, &submit(120)).await;
        let UpdateScoreResp(ack) = reply.open().unwrap();
        assert!(ack.success);

        let reply = dispatch(&orchestrator, &submit(80)).await;
        assert_eq!(error_of(&reply).code, arcade_types::CODE_SCORE_NOT_IMPROVED);

        let reply = dispatch(
            &orchestrator,
            &Envelope::wrap(&GetLeaderboardReq(PlayerRef { player_id: 7 })),
        )
        .await;
        let board: GetLeaderboardResp = reply.open().unwrap();
        assert_eq!(board.your_score, 120);
        assert_eq!(board.your_rank, 0);
        assert!(board.top_players.is_empty());
    }
}
