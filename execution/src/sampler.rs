//! Seedable weighted sampler.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::{
    sync::{Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

/// Returned by [`Sampler::pick_weighted`] when no entry has a positive weight.
pub const NO_PICK: i64 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeightedEntry {
    pub id: i64,
    pub weight: i64,
}

impl WeightedEntry {
    pub fn new(id: i64, weight: i64) -> Self {
        Self { id, weight }
    }
}

/// Owns an RNG and serialises every draw through a mutex.
#[derive(Debug)]
pub struct Sampler {
    rng: Mutex<ChaCha20Rng>,
}

impl Sampler {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }

    /// Seeds from the wall clock.
    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::seeded(nanos)
    }

    /// Seeds from `seed` when set, otherwise from the wall clock.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_clock(),
        }
    }

    fn draw(&self, upper: i64) -> i64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0..upper)
    }

    /// True with probability `percent / 100`.
    pub fn roll(&self, percent: i64) -> bool {
        if percent <= 0 {
            return false;
        }
        if percent >= 100 {
            return true;
        }
        self.draw(100) < percent
    }

    /// Picks an id with probability proportional to its weight.
    ///
    /// Entries with a non-positive weight are ignored. Returns [`NO_PICK`] when
    /// nothing remains.
    pub fn pick_weighted(&self, entries: &[WeightedEntry]) -> i64 {
        let total: i64 = entries
            .iter()
            .filter(|entry| entry.weight > 0)
            .map(|entry| entry.weight)
            .sum();
        if total == 0 {
            return NO_PICK;
        }

        let target = self.draw(total);
        let mut running = 0;
        for entry in entries.iter().filter(|entry| entry.weight > 0) {
            running += entry.weight;
            if running > target {
                return entry.id;
            }
        }
        NO_PICK
    }
}
