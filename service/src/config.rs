use anyhow::{Context, Result};
use arcade_execution::Sampler;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_STREAM_KEY: &str = "gacha_pull_events";
const DEFAULT_CONSUMER_GROUP: &str = "gacha_history";
const DEFAULT_CONSUMER_NAME: &str = "gacha_history_worker";
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RECALCULATE_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_VERDICT_TTL_SECONDS: u64 = arcade_types::VERDICT_TTL_SECS;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConsumerConfig {
    pub stream_key: Option<String>,
    pub consumer_group: Option<String>,
    pub consumer_name: Option<String>,
    pub batch_size: Option<usize>,
    pub block_timeout_ms: Option<u64>,
}

impl StreamConsumerConfig {
    pub fn stream_key(&self) -> &str {
        self.stream_key.as_deref().unwrap_or(DEFAULT_STREAM_KEY)
    }

    pub fn consumer_group(&self) -> &str {
        self.consumer_group
            .as_deref()
            .unwrap_or(DEFAULT_CONSUMER_GROUP)
    }

    /// Pending entries belong to this name, so it must survive restarts.
    pub fn consumer_name(&self) -> &str {
        self.consumer_name.as_deref().unwrap_or(DEFAULT_CONSUMER_NAME)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }

    pub fn block_timeout(&self) -> Duration {
        Duration::from_millis(self.block_timeout_ms.unwrap_or(DEFAULT_BLOCK_TIMEOUT_MS))
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LeaderboardConfig {
    pub recalculate_interval_seconds: Option<u64>,
    pub rank_limit: Option<usize>,
}

impl LeaderboardConfig {
    pub fn recalculate_interval(&self) -> Duration {
        Duration::from_secs(
            self.recalculate_interval_seconds
                .unwrap_or(DEFAULT_RECALCULATE_INTERVAL_SECONDS)
                .max(1),
        )
    }

    pub fn rank_limit(&self) -> usize {
        self.rank_limit
            .unwrap_or(arcade_types::LEADERBOARD_RANK_LIMIT)
            .max(1)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct VerdictCacheConfig {
    pub ttl_seconds: Option<u64>,
}

impl VerdictCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(
            self.ttl_seconds
                .unwrap_or(DEFAULT_VERDICT_TTL_SECONDS)
                .max(1),
        )
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub redis_url: Option<String>,
    /// SQLite database; in-memory when unset.
    pub database_path: Option<PathBuf>,
    /// YAML catalogue loaded into the database on start-up.
    pub catalogue_path: Option<PathBuf>,
    /// Sampler seed; the wall clock is used when unset.
    pub rng_seed: Option<u64>,
    pub stream_consumer: StreamConsumerConfig,
    pub leaderboard: LeaderboardConfig,
    pub verdict_cache: VerdictCacheConfig,
}

impl ServiceConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("parse service config")
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read service config {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    pub fn redis_url(&self) -> &str {
        self.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL)
    }

    /// Sampler seeded from `rng_seed`, or from the wall clock when unset.
    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.rng_seed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_consumer.stream_key().trim().is_empty() {
            anyhow::bail!("stream_consumer.stream_key must not be empty");
        }
        if self.stream_consumer.consumer_group().trim().is_empty() {
            anyhow::bail!("stream_consumer.consumer_group must not be empty");
        }
        if self.stream_consumer.consumer_name().trim().is_empty() {
            anyhow::bail!("stream_consumer.consumer_name must not be empty");
        }
        if let Some(0) = self.stream_consumer.batch_size {
            anyhow::bail!("stream_consumer.batch_size must be > 0 when set");
        }
        if let Some(0) = self.leaderboard.recalculate_interval_seconds {
            anyhow::bail!("leaderboard.recalculate_interval_seconds must be > 0 when set");
        }
        if let Some(0) = self.verdict_cache.ttl_seconds {
            anyhow::bail!("verdict_cache.ttl_seconds must be > 0 when set");
        }
        Ok(())
    }
}
