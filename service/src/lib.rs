//! Arcade reward service.
//!
//! Wires the reward engines to their collaborators: the machine catalogue, the player
//! wallet, the history sink, the pity and leaderboard stores, the short-lived result
//! cache, and the gacha event stream. The [`Orchestrator`] handles one game request at
//! a time; [`LeaderboardMaterialiser`] and [`GachaHistoryConsumer`] run in the
//! background.

pub mod cache;
pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod leaderboard;
pub mod memory;
pub mod pity;
pub mod seed;
pub mod session;
pub mod sqlite;
pub mod store;
pub mod stream;

pub use cache::RedisCache;
pub use config::ServiceConfig;
pub use consumer::{GachaHistoryConsumer, PollReport};
pub use dispatch::dispatch;
pub use error::{SessionError, StoreError};
pub use leaderboard::{LeaderboardMaterialiser, LeaderboardService, Standings};
pub use memory::{MemoryCache, MemoryStore, MemoryStream};
pub use pity::PityManager;
pub use seed::{Seedable, SeedData};
pub use session::{ClawStart, Orchestrator};
pub use sqlite::SqliteStore;
pub use store::*;
pub use stream::RedisStream;
