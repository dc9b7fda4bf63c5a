//! Bounded rolling history of settled rounds

use sicbo_core::RoundResult;
use std::collections::VecDeque;
use std::sync::RwLock;

/// Default number of rounds kept in memory
pub const DEFAULT_CAPACITY: usize = 200;

/// Thread-safe FIFO store of the most recent settled rounds.
///
/// Appending at capacity evicts the oldest round first, so the store never
/// holds more than `capacity` entries and insertion order is preserved.
pub struct RollingHistory {
    rounds: RwLock<VecDeque<RoundResult>>,
    capacity: usize,
}

impl RollingHistory {
    /// Create an empty history bounded at `capacity` rounds (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rounds: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a settled round, evicting the oldest one if full
    pub fn append(&self, round: RoundResult) {
        let mut rounds = match self.rounds.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if rounds.len() >= self.capacity {
            rounds.pop_front();
        }
        rounds.push_back(round);
    }

    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<RoundResult> {
        self.rounds
            .read()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Most recently settled round
    pub fn latest(&self) -> Option<RoundResult> {
        self.rounds.read().ok()?.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.rounds.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
