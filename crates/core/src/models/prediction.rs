//! Prediction models

use crate::types::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted outcome of the next round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictedOutcome {
    High,
    Low,
    /// Not enough history to say anything
    Unknown,
}

impl From<Outcome> for PredictedOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::High => PredictedOutcome::High,
            Outcome::Low => PredictedOutcome::Low,
        }
    }
}

impl fmt::Display for PredictedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictedOutcome::High => write!(f, "High"),
            PredictedOutcome::Low => write!(f, "Low"),
            PredictedOutcome::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Best guess for the next round with a confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: PredictedOutcome,
    pub confidence: f64,
    /// One human-readable line per signal that contributed
    pub rationale: Vec<String>,
}

impl Prediction {
    pub fn new(outcome: impl Into<PredictedOutcome>, confidence: f64, rationale: Vec<String>) -> Self {
        Self {
            outcome: outcome.into(),
            confidence: confidence.clamp(0.0, 1.0),
            rationale,
        }
    }

    /// Prediction for a history that is still too short
    pub fn unknown(required: usize, available: usize) -> Self {
        Self {
            outcome: PredictedOutcome::Unknown,
            confidence: 0.0,
            rationale: vec![format!(
                "Waiting for {} more round(s) before predicting ({} of {} collected)",
                required.saturating_sub(available),
                available,
                required
            )],
        }
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Self {
            outcome: PredictedOutcome::Unknown,
            confidence: 0.0,
            rationale: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_states_remaining_rounds() {
        let prediction = Prediction::unknown(20, 7);
        assert_eq!(prediction.outcome, PredictedOutcome::Unknown);
        assert_eq!(prediction.confidence, 0.0);
        assert!(prediction.rationale[0].contains("13 more"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let prediction = Prediction::new(Outcome::High, 1.3, Vec::new());
        assert_eq!(prediction.confidence, 1.0);
        assert_eq!(prediction.outcome, PredictedOutcome::High);
    }
}
