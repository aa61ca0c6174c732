//! Arcade reward engines.
//!
//! This crate contains the synchronous, non-blocking pieces of the reward core: the
//! weighted [`Sampler`], the claw spawn engine, the claw catch oracle, the gacha pull
//! engine with its pity transition, and leaderboard ranking.
//!
//! ## Determinism requirements
//! - All randomness flows through a [`Sampler`]; engines never reach for a global RNG.
//! - A sampler seeded with the same value yields the same draws in the same order.
//! - Iteration follows the declared order of machine items, never hash order.

pub mod catch;
pub mod error;
pub mod gacha;
pub mod leaderboard;
pub mod sampler;
pub mod spawn;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use catch::pre_roll;
pub use error::EngineError;
pub use gacha::{advance_pity, bucket_for, pull_once, Bucket, PullOutcome};
pub use leaderboard::{accepts_score, materialise};
pub use sampler::{Sampler, WeightedEntry};
pub use spawn::{spawn_for_machine, spawn_with_controls, SpawnCandidate};
