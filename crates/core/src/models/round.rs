//! Settled round model

use crate::types::{Outcome, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One settled round: three dice faces, their total and the High/Low outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    /// `None` when the settlement arrived without a preceding session announcement
    pub session_id: Option<SessionId>,
    pub dice1: i64,
    pub dice2: i64,
    pub dice3: i64,
    pub total: i64,
    pub outcome: Outcome,
    pub settled_at: DateTime<Utc>,
}

impl RoundResult {
    /// Build a round from raw dice faces, deriving total and outcome
    pub fn settle(session_id: Option<SessionId>, dice: [i64; 3]) -> Self {
        let total = dice.iter().fold(0i64, |total, d| total.saturating_add(*d));
        Self {
            session_id,
            dice1: dice[0],
            dice2: dice[1],
            dice3: dice[2],
            total,
            outcome: Outcome::from_total(total),
            settled_at: Utc::now(),
        }
    }

    pub fn dice(&self) -> [i64; 3] {
        [self.dice1, self.dice2, self.dice3]
    }
}

/// Receives every settled round after it has been committed to history
pub trait RoundObserver: Send + Sync {
    fn round_settled(&self, round: &RoundResult);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_and_outcome_for_every_triple() {
        for d1 in 1..=6 {
            for d2 in 1..=6 {
                for d3 in 1..=6 {
                    let round = RoundResult::settle(None, [d1, d2, d3]);
                    assert_eq!(round.total, d1 + d2 + d3);
                    let expected = if d1 + d2 + d3 > 10 {
                        Outcome::High
                    } else {
                        Outcome::Low
                    };
                    assert_eq!(round.outcome, expected);
                }
            }
        }
    }

    #[test]
    fn test_settle_keeps_session() {
        let round = RoundResult::settle(Some(SessionId::new(77)), [6, 5, 4]);
        assert_eq!(round.session_id, Some(SessionId::new(77)));
        assert_eq!(round.dice(), [6, 5, 4]);
        assert_eq!(round.outcome, Outcome::High);
    }

    #[test]
    fn test_settle_saturates_instead_of_overflowing() {
        let round = RoundResult::settle(None, [i64::MAX, 1, 1]);
        assert_eq!(round.total, i64::MAX);
        assert_eq!(round.outcome, Outcome::High);

        let round = RoundResult::settle(None, [i64::MIN, -1, 0]);
        assert_eq!(round.total, i64::MIN);
        assert_eq!(round.outcome, Outcome::Low);
    }
}
