use arcade_types::STREAM_DATA_FIELD;
use redis::{
    streams::{StreamReadOptions, StreamReadReply},
    AsyncCommands,
};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    store::{EventStream, StreamEntry},
    StoreError,
};

type Slot = Mutex<Option<redis::aio::ConnectionManager>>;

/// Gacha event stream on a Redis stream key, read through one consumer of a group.
///
/// Blocking reads use their own connection so publishes are never queued behind them.
pub struct RedisStream {
    client: redis::Client,
    stream_key: String,
    group: String,
    consumer: String,
    writer: Slot,
    reader: Slot,
}

impl RedisStream {
    pub fn new(
        url: &str,
        stream_key: String,
        group: String,
        consumer: String,
    ) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            stream_key,
            group,
            consumer,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        })
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    async fn ensure<'a>(
        &self,
        slot: &'a Slot,
    ) -> Result<MutexGuard<'a, Option<redis::aio::ConnectionManager>>, StoreError> {
        let mut guard = slot.lock().await;
        if guard.is_none() {
            *guard = Some(self.client.get_connection_manager().await?);
        }
        Ok(guard)
    }

    fn options(&self, count: usize) -> StreamReadOptions {
        StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(count)
    }
}

fn settle<T>(
    guard: &mut MutexGuard<'_, Option<redis::aio::ConnectionManager>>,
    result: redis::RedisResult<T>,
) -> Result<T, StoreError> {
    result.map_err(|err| {
        tracing::warn!("Redis stream command failed: {err}");
        **guard = None;
        err.into()
    })
}

fn disconnected() -> StoreError {
    StoreError::Unavailable("redis connection missing".to_string())
}

fn entries(reply: Option<StreamReadReply>) -> Vec<StreamEntry> {
    reply
        .into_iter()
        .flat_map(|reply| reply.keys)
        .flat_map(|key| key.ids)
        .map(|id| StreamEntry {
            data: id.get::<String>(STREAM_DATA_FIELD),
            id: id.id,
        })
        .collect()
}

impl EventStream for RedisStream {
    async fn ensure_group(&self) -> Result<(), StoreError> {
        let mut guard = self.ensure(&self.writer).await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.stream_key, &self.group, "0")
            .await;
        match result {
            Err(err) if err.code() == Some("BUSYGROUP") => Ok(()),
            other => settle(&mut guard, other),
        }
    }

    async fn publish(&self, data: String) -> Result<String, StoreError> {
        let mut guard = self.ensure(&self.writer).await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<String> = conn
            .xadd(&self.stream_key, "*", &[(STREAM_DATA_FIELD, data)])
            .await;
        settle(&mut guard, result)
    }

    async fn read_pending(
        &self,
        after: &str,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let mut guard = self.ensure(&self.reader).await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        // An explicit id reads this consumer's pending list instead of new entries.
        let result: redis::RedisResult<Option<StreamReadReply>> = conn
            .xread_options(&[&self.stream_key], &[after], &self.options(count))
            .await;
        settle(&mut guard, result).map(entries)
    }

    async fn read_new(
        &self,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let mut guard = self.ensure(&self.reader).await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let mut options = self.options(count);
        // BLOCK 0 waits forever on Redis.
        if !block.is_zero() {
            options = options.block(block.as_millis() as usize);
        }
        let result: redis::RedisResult<Option<StreamReadReply>> = conn
            .xread_options(&[&self.stream_key], &[">"], &options)
            .await;
        settle(&mut guard, result).map(entries)
    }

    async fn ack(&self, entry_id: &str) -> Result<(), StoreError> {
        let mut guard = self.ensure(&self.writer).await?;
        let Some(conn) = guard.as_mut() else {
            return Err(disconnected());
        };
        let result: redis::RedisResult<i64> =
            conn.xack(&self.stream_key, &self.group, &[entry_id]).await;
        settle(&mut guard, result).map(|_| ())
    }
}
