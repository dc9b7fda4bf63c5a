//! Snapshot served by the read endpoint

use super::{PredictedOutcome, Prediction, RoundResult};
use crate::types::{Outcome, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest settled round plus the prediction computed right after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub session_id: Option<SessionId>,
    pub dice1: Option<i64>,
    pub dice2: Option<i64>,
    pub dice3: Option<i64>,
    pub total: Option<i64>,
    pub outcome: Option<Outcome>,
    pub predictor_outcome: PredictedOutcome,
    pub predictor_confidence: f64,
    pub predictor_rationale: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn from_round(round: &RoundResult, prediction: Prediction) -> Self {
        Self {
            session_id: round.session_id,
            dice1: Some(round.dice1),
            dice2: Some(round.dice2),
            dice3: Some(round.dice3),
            total: Some(round.total),
            outcome: Some(round.outcome),
            predictor_outcome: prediction.outcome,
            predictor_confidence: prediction.confidence,
            predictor_rationale: prediction.rationale,
            updated_at: Some(Utc::now()),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            session_id: None,
            dice1: None,
            dice2: None,
            dice3: None,
            total: None,
            outcome: None,
            predictor_outcome: PredictedOutcome::Unknown,
            predictor_confidence: 0.0,
            predictor_rationale: Vec::new(),
            updated_at: None,
        }
    }
}
