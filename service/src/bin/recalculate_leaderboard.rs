//! Runs one whack-a-mole leaderboard materialisation pass and exits.

use anyhow::{Context, Result};
use arcade_service::{LeaderboardMaterialiser, SqliteStore};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recompute whack-a-mole leaderboard ranks once")]
struct Args {
    /// SQLite database file.
    #[arg(long, env = "ARCADE_DATABASE_PATH")]
    database_path: PathBuf,

    /// Rows past this position get rank 0.
    #[arg(long, default_value_t = arcade_types::LEADERBOARD_RANK_LIMIT)]
    rank_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if args.rank_limit == 0 {
        anyhow::bail!("rank_limit must be > 0");
    }
    let store = Arc::new(SqliteStore::open(&args.database_path)?);
    let ranked = LeaderboardMaterialiser::new(store, args.rank_limit)
        .run_once()
        .await
        .context("materialise leaderboard")?;
    info!(ranked, rank_limit = args.rank_limit, "leaderboard recalculated");
    Ok(())
}
