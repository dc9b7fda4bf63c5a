//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Round identifier announced by the game service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binary classification of a round's dice total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    High,
    Low,
}

impl Outcome {
    /// Totals of 11..=18 are High, 3..=10 are Low
    pub const HIGH_THRESHOLD: i64 = 10;

    pub fn from_total(total: i64) -> Self {
        if total > Self::HIGH_THRESHOLD {
            Outcome::High
        } else {
            Outcome::Low
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Outcome::High => Outcome::Low,
            Outcome::Low => Outcome::High,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::High => write!(f, "High"),
            Outcome::Low => write!(f, "Low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_split_at_ten() {
        assert_eq!(Outcome::from_total(3), Outcome::Low);
        assert_eq!(Outcome::from_total(10), Outcome::Low);
        assert_eq!(Outcome::from_total(11), Outcome::High);
        assert_eq!(Outcome::from_total(18), Outcome::High);
    }

    #[test]
    fn test_session_id_is_plain_number_on_the_wire() {
        let json = serde_json::to_string(&SessionId::new(2_145_334)).unwrap();
        assert_eq!(json, "2145334");
    }
}
