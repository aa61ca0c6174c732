use anyhow::{Context, Result};
use arcade_service::{
    GachaHistoryConsumer, LeaderboardMaterialiser, RedisStream, SeedData, Seedable,
    ServiceConfig, SqliteStore,
};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Arcade reward core background workers")]
struct Args {
    /// YAML service configuration (defaults apply when omitted).
    #[arg(short, long, env = "ARCADE_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "ARCADE_REDIS_URL")]
    redis_url: Option<String>,

    /// SQLite database file (in-memory when omitted).
    #[arg(long, env = "ARCADE_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// YAML catalogue of machines, mole weights and accounts to upsert on start-up.
    #[arg(long)]
    catalogue: Option<PathBuf>,

    #[arg(long)]
    stream_key: Option<String>,

    #[arg(long)]
    consumer_group: Option<String>,

    /// Stable consumer name; a random one is generated when unset.
    #[arg(long, env = "ARCADE_CONSUMER_NAME")]
    consumer_name: Option<String>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    block_timeout_ms: Option<u64>,

    /// Leaderboard materialisation period in seconds (must be > 0 when set).
    #[arg(long)]
    recalculate_interval_seconds: Option<u64>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn build_config(args: &Args) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::from_yaml_file(path)?,
        None => ServiceConfig::default(),
    };

    if let Some(url) = &args.redis_url {
        config.redis_url = Some(url.clone());
    }
    if let Some(path) = &args.database_path {
        config.database_path = Some(path.clone());
    }
    if let Some(path) = &args.catalogue {
        config.catalogue_path = Some(path.clone());
    }
    let consumer = &mut config.stream_consumer;
    consumer.stream_key = args.stream_key.clone().or(consumer.stream_key.take());
    consumer.consumer_group = args
        .consumer_group
        .clone()
        .or(consumer.consumer_group.take());
    consumer.consumer_name = args.consumer_name.clone().or(consumer.consumer_name.take());
    consumer.batch_size = args.batch_size.or(consumer.batch_size);
    consumer.block_timeout_ms = args.block_timeout_ms.or(consumer.block_timeout_ms);
    config.leaderboard.recalculate_interval_seconds = args
        .recalculate_interval_seconds
        .or(config.leaderboard.recalculate_interval_seconds);

    config.validate()?;
    Ok(config)
}

fn open_store(config: &ServiceConfig) -> Result<SqliteStore> {
    match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "opening arcade database");
            SqliteStore::open(path)
        }
        None => {
            warn!("no database path configured, history is kept in memory");
            SqliteStore::open_in_memory()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = build_config(&args)?;
    let store = Arc::new(open_store(&config)?);

    if let Some(path) = &config.catalogue_path {
        let catalogue = SeedData::from_yaml_file(path)?;
        catalogue.validate()?;
        store
            .seed(&catalogue)
            .await
            .context("seed catalogue")?;
        info!(
            path = %path.display(),
            claw_machines = catalogue.claw_machines.len(),
            gacha_machines = catalogue.gacha_machines.len(),
            accounts = catalogue.accounts.len(),
            "catalogue loaded"
        );
    }

    let consumer_config = &config.stream_consumer;
    let stream = Arc::new(
        RedisStream::new(
            config.redis_url(),
            consumer_config.stream_key().to_string(),
            consumer_config.consumer_group().to_string(),
            consumer_config.consumer_name().to_string(),
        )
        .context("invalid redis url")?,
    );
    info!(
        stream_key = stream.stream_key(),
        consumer = stream.consumer(),
        "gacha history consumer configured"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let materialiser =
        LeaderboardMaterialiser::new(Arc::clone(&store), config.leaderboard.rank_limit());
    let materialiser = tokio::spawn(
        materialiser.run(config.leaderboard.recalculate_interval(), shutdown_rx.clone()),
    );
    let consumer = GachaHistoryConsumer::new(
        Arc::clone(&store),
        stream,
        consumer_config.batch_size(),
        consumer_config.block_timeout(),
    );
    let consumer = tokio::spawn(consumer.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    let (materialiser, consumer) = tokio::join!(materialiser, consumer);
    materialiser.context("leaderboard materialiser panicked")?;
    consumer.context("gacha history consumer panicked")?;
    info!("stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "arcade-service",
            "--stream-key",
            "pulls",
            "--batch-size",
            "25",
            "--recalculate-interval-seconds",
            "15",
            "--consumer-name",
            "worker-1",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.stream_consumer.stream_key(), "pulls");
        assert_eq!(config.stream_consumer.batch_size(), 25);
        assert_eq!(config.stream_consumer.consumer_name(), "worker-1");
        assert_eq!(
            config.leaderboard.recalculate_interval(),
            Duration::from_secs(15)
        );
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "stream_consumer:\n  stream_key: from-file\n  batch_size: 5\nverdict_cache:\n  ttl_seconds: 60"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::parse_from(["arcade-service", "--config", &path, "--batch-size", "7"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.stream_consumer.stream_key(), "from-file");
        assert_eq!(config.stream_consumer.batch_size(), 7);
        assert_eq!(config.verdict_cache.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_zero_interval() {
        let args = Args::parse_from(["arcade-service", "--recalculate-interval-seconds", "0"]);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("recalculate_interval_seconds"),
            "unexpected error: {err}"
        );
    }
}
