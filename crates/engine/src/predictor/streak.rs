//! Streak Predictor - Follow short runs and 1-1 alternations
//!
//! Looks only at the last three outcomes. A three-in-a-row run is followed,
//! an A-B-A alternation is continued, anything else is a coin flip.

use super::random::RandomSource;
use super::Predictor;
use sicbo_core::{Outcome, Prediction, RoundResult};
use std::sync::Arc;

/// Configuration for the streak predictor
#[derive(Debug, Clone)]
pub struct StreakConfig {
    /// Rounds required before predicting
    pub min_history: usize,
    pub streak_confidence: f64,
    pub alternation_confidence: f64,
    pub coin_flip_confidence: f64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            streak_confidence: 0.85,
            alternation_confidence: 0.80,
            coin_flip_confidence: 0.50,
        }
    }
}

pub struct StreakPredictor {
    config: StreakConfig,
    random: Arc<dyn RandomSource>,
}

impl StreakPredictor {
    pub fn new(config: StreakConfig, random: Arc<dyn RandomSource>) -> Self {
        Self { config, random }
    }
}

impl Predictor for StreakPredictor {
    fn predict(&self, history: &[RoundResult]) -> Prediction {
        let required = self.config.min_history.max(3);
        if history.len() < required {
            return Prediction::unknown(required, history.len());
        }

        let (a, b, c) = match &history[history.len() - 3..] {
            [a, b, c] => (a.outcome, b.outcome, c.outcome),
            _ => return Prediction::unknown(required, history.len()),
        };

        if a == b && b == c {
            return Prediction::new(
                c,
                self.config.streak_confidence,
                vec![format!("{} streak (3+ rounds), following it", c)],
            );
        }

        if a != b && a == c {
            return Prediction::new(
                b,
                self.config.alternation_confidence,
                vec![format!("1-1 alternation ({}-{}-{}), following it", a, b, c)],
            );
        }

        let guess = if self.random.coin_flip() {
            Outcome::High
        } else {
            Outcome::Low
        };
        Prediction::new(
            guess,
            self.config.coin_flip_confidence,
            vec!["No clear streak or alternation, random guess".to_string()],
        )
    }

    fn name(&self) -> &str {
        "streak"
    }

    fn min_history(&self) -> usize {
        self.config.min_history.max(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::random::FixedRandom;
    use crate::predictor::signals::tests::rounds;
    use sicbo_core::PredictedOutcome;

    fn predictor(flip: bool) -> StreakPredictor {
        StreakPredictor::new(StreakConfig::default(), Arc::new(FixedRandom(flip)))
    }

    #[test]
    fn test_waits_for_five_rounds() {
        let prediction = predictor(true).predict(&rounds("LLLL"));
        assert_eq!(prediction.outcome, PredictedOutcome::Unknown);
        assert_eq!(prediction.confidence, 0.0);
        assert!(prediction.rationale[0].contains("1 more"));
    }

    #[test]
    fn test_follows_streak() {
        let prediction = predictor(true).predict(&rounds("LLLLL"));
        assert_eq!(prediction.outcome, PredictedOutcome::Low);
        assert_eq!(prediction.confidence, 0.85);
    }

    #[test]
    fn test_continues_alternation() {
        let prediction = predictor(true).predict(&rounds("LLHLH"));
        assert_eq!(prediction.outcome, PredictedOutcome::Low);
        assert_eq!(prediction.confidence, 0.80);
        assert_eq!(prediction.rationale, vec!["1-1 alternation (High-Low-High), following it"]);
    }

    #[test]
    fn test_coin_flip_uses_injected_source() {
        let history = rounds("HHLLH");
        let high = predictor(true).predict(&history);
        let low = predictor(false).predict(&history);

        assert_eq!(high.outcome, PredictedOutcome::High);
        assert_eq!(low.outcome, PredictedOutcome::Low);
        assert_eq!(high.confidence, 0.50);
    }

    #[test]
    fn test_deterministic_branches_repeat() {
        let p = predictor(true);
        let history = rounds("HLHHH");
        assert_eq!(p.predict(&history), p.predict(&history));
    }
}
