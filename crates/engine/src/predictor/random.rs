//! Injectable randomness for coin-flip fallbacks

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Source of the 50/50 guesses some predictors fall back to
pub trait RandomSource: Send + Sync {
    /// `true` means High
    fn coin_flip(&self) -> bool;
}

/// Thread-local OS-seeded RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn coin_flip(&self) -> bool {
        rand::thread_rng().gen_bool(0.5)
    }
}

/// Reproducible sequence from a fixed seed
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn coin_flip(&self) -> bool {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_bool(0.5)
    }
}

/// Always lands on the same side
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub bool);

impl RandomSource for FixedRandom {
    fn coin_flip(&self) -> bool {
        self.0
    }
}
