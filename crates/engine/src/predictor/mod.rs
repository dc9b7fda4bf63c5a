//! Next-round predictors
//!
//! Two independent heuristics are available. They are alternatives with
//! their own thresholds, selected once at startup.

mod multi_signal;
pub mod random;
pub mod signals;
mod streak;

pub use multi_signal::{MultiSignalConfig, MultiSignalPredictor};
pub use random::{FixedRandom, RandomSource, SeededRandom, ThreadRandom};
pub use streak::{StreakConfig, StreakPredictor};

use serde::{Deserialize, Serialize};
use sicbo_core::{Error, Prediction, RoundResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Interface for next-round predictors
pub trait Predictor: Send + Sync {
    /// Score the next round from history, oldest first. Never fails: short
    /// histories yield an `Unknown` prediction.
    fn predict(&self, history: &[RoundResult]) -> Prediction;

    /// Get predictor name
    fn name(&self) -> &str;

    /// Rounds needed before a real prediction is made
    fn min_history(&self) -> usize;
}

/// Which predictor to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredictorKind {
    /// 20-round weighted multi-signal scorer
    #[default]
    MultiSignal,
    /// 5-round streak/alternation follower with a random fallback
    Streak,
}

impl PredictorKind {
    pub fn build(self, random: Arc<dyn RandomSource>) -> Arc<dyn Predictor> {
        match self {
            PredictorKind::MultiSignal => Arc::new(MultiSignalPredictor::default()),
            PredictorKind::Streak => Arc::new(StreakPredictor::new(StreakConfig::default(), random)),
        }
    }
}

impl FromStr for PredictorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multi-signal" | "multi_signal" | "multisignal" => Ok(PredictorKind::MultiSignal),
            "streak" => Ok(PredictorKind::Streak),
            other => Err(Error::Config(format!(
                "unknown predictor '{}', expected 'multi-signal' or 'streak'",
                other
            ))),
        }
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictorKind::MultiSignal => write!(f, "multi-signal"),
            PredictorKind::Streak => write!(f, "streak"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("multi-signal".parse::<PredictorKind>().unwrap(), PredictorKind::MultiSignal);
        assert_eq!(" Streak ".parse::<PredictorKind>().unwrap(), PredictorKind::Streak);
        assert!("markov".parse::<PredictorKind>().is_err());
    }

    #[test]
    fn test_build_keeps_thresholds_apart() {
        let random: Arc<dyn RandomSource> = Arc::new(FixedRandom(true));
        let multi = PredictorKind::MultiSignal.build(random.clone());
        let streak = PredictorKind::Streak.build(random);

        assert_eq!(multi.name(), "multi-signal");
        assert_eq!(multi.min_history(), 20);
        assert_eq!(streak.name(), "streak");
        assert_eq!(streak.min_history(), 5);
    }
}
