use arcade_types::{
    pity_key, verdict_key, GachaPityState, Verdict, PITY_FIELD_SUPER, PITY_FIELD_ULTRA,
};
use redis::AsyncCommands;
use std::{collections::HashMap, time::Duration};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    store::{PityCache, VerdictCache},
    StoreError,
};

/// Parses a staged pity hash. Missing fields count as zero.
pub fn pity_from_fields(
    machine_id: i64,
    player_id: i64,
    fields: &HashMap<String, String>,
) -> Result<GachaPityState, StoreError> {
    let field = |name: &str| -> Result<i32, StoreError> {
        match fields.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|_| StoreError::Corrupt(format!("{name} is not an integer: {raw}"))),
            None => Ok(0),
        }
    };
    Ok(GachaPityState {
        player_id,
        machine_id,
        super_rare_pity_count: field(PITY_FIELD_SUPER)?,
        ultra_rare_pity_count: field(PITY_FIELD_ULTRA)?,
    })
}

/// Verdict and pity cache backed by Redis.
pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<redis::aio::ConnectionManager>>,
}

impl RedisCache {
    pub fn new(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn ensure_connection(
        &self,
    ) -> Result<MutexGuard<'_, Option<redis::aio::ConnectionManager>>, StoreError> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.get_connection_manager().await?);
        }
        Ok(guard)
    }
}

fn settle<T>(
    guard: &mut MutexGuard<'_, Option<redis::aio::ConnectionManager>>,
    result: redis::RedisResult<T>,
) -> Result<T, StoreError> {
    result.map_err(|err| {
        tracing::warn!("Redis cache command failed: {err}");
        **guard = None;
        err.into()
    })
}

fn disconnected() -> StoreError {
    StoreError::Unavailable("redis connection missing".to_string())
}

impl VerdictCache for RedisCache {
    async fn put_verdicts(
        &self,
        game_id: i64,
        verdicts: &[Verdict],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(verdicts)?;
        let mut guard = self.ensure_connection().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<()> = conn
            .set_ex(verdict_key(game_id), json, ttl.as_secs().max(1))
            .await;
        settle(&mut guard, result)
    }

    async fn get_verdicts(&self, game_id: i64) -> Result<Option<Vec<Verdict>>, StoreError> {
        let mut guard = self.ensure_connection().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<Option<String>> = conn.get(verdict_key(game_id)).await;
        match settle(&mut guard, result)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete_verdicts(&self, game_id: i64) -> Result<(), StoreError> {
        let mut guard = self.ensure_connection().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<()> = conn.del(verdict_key(game_id)).await;
        settle(&mut guard, result)
    }
}

impl PityCache for RedisCache {
    async fn stage_pity(&self, state: &GachaPityState) -> Result<(), StoreError> {
        let fields = [
            (PITY_FIELD_ULTRA, state.ultra_rare_pity_count.to_string()),
            (PITY_FIELD_SUPER, state.super_rare_pity_count.to_string()),
        ];
        let mut guard = self.ensure_connection().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<()> = conn
            .hset_multiple(pity_key(state.machine_id, state.player_id), &fields)
            .await;
        settle(&mut guard, result)
    }

    async fn cached_pity(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> Result<Option<GachaPityState>, StoreError> {
        let mut guard = self.ensure_connection().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<HashMap<String, String>> =
            conn.hgetall(pity_key(machine_id, player_id)).await;
        let fields = settle(&mut guard, result)?;
        if fields.is_empty() {
            return Ok(None);
        }
        pity_from_fields(machine_id, player_id, &fields).map(Some)
    }

    async fn delete_pity(&self, machine_id: i64, player_id: i64) -> Result<(), StoreError> {
        let mut guard = self.ensure_connection().await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<()> = conn.del(pity_key(machine_id, player_id)).await;
        settle(&mut guard, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pity_fields_parse() {
        let fields = HashMap::from([
            (PITY_FIELD_ULTRA.to_string(), "42".to_string()),
            (PITY_FIELD_SUPER.to_string(), "3".to_string()),
        ]);
        let state = pity_from_fields(7, 1001, &fields).unwrap();
        assert_eq!(state.machine_id, 7);
        assert_eq!(state.player_id, 1001);
        assert_eq!(state.ultra_rare_pity_count, 42);
        assert_eq!(state.super_rare_pity_count, 3);
    }

    #[test]
    fn missing_pity_fields_are_zero() {
        let state = pity_from_fields(1, 2, &HashMap::new()).unwrap();
        assert_eq!(state, GachaPityState::fresh(1, 2));
    }

    #[test]
    fn non_numeric_pity_fields_are_corrupt() {
        let fields = HashMap::from([(PITY_FIELD_SUPER.to_string(), "many".to_string())]);
        assert!(matches!(
            pity_from_fields(1, 2, &fields),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn client_rejects_malformed_urls() {
        assert!(RedisCache::new("not a url").is_err());
    }
}
