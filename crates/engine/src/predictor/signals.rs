//! Building blocks shared by the predictors: streaks, window statistics
//! and n-gram continuations.

use sicbo_core::{Outcome, RoundResult};

/// Current run of identical outcomes ending at the latest round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakAnalysis {
    pub length: usize,
    pub current: Option<Outcome>,
    pub break_probability: f64,
}

/// Heuristic chance that a run of `length` ends on the next round
pub fn break_probability(length: usize) -> f64 {
    match length {
        0..=2 => 0.0,
        3..=4 => 0.40 + 0.10 * (length - 3) as f64,
        5..=6 => 0.75 + 0.07 * (length - 5) as f64,
        _ => 0.90,
    }
}

pub fn analyze_streak(history: &[RoundResult]) -> StreakAnalysis {
    let Some(last) = history.last() else {
        return StreakAnalysis {
            length: 0,
            current: None,
            break_probability: 0.0,
        };
    };

    let length = history
        .iter()
        .rev()
        .take_while(|r| r.outcome == last.outcome)
        .count();

    StreakAnalysis {
        length,
        current: Some(last.outcome),
        break_probability: break_probability(length),
    }
}

/// Distribution statistics over a window of rounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub high_count: usize,
    pub low_count: usize,
    /// `|high - low| / len`
    pub imbalance: f64,
    /// Fraction of adjacent pairs whose outcome differs
    pub switch_rate: f64,
    pub mean_total: f64,
    /// Population standard deviation of totals
    pub total_std_dev: f64,
}

impl WindowStats {
    /// The outcome seen less often, `None` on a perfect split
    pub fn minority(&self) -> Option<Outcome> {
        match self.high_count.cmp(&self.low_count) {
            std::cmp::Ordering::Greater => Some(Outcome::Low),
            std::cmp::Ordering::Less => Some(Outcome::High),
            std::cmp::Ordering::Equal => None,
        }
    }
}

pub fn analyze_statistics(window: &[RoundResult]) -> WindowStats {
    let len = window.len();
    if len == 0 {
        return WindowStats {
            high_count: 0,
            low_count: 0,
            imbalance: 0.0,
            switch_rate: 0.0,
            mean_total: 0.0,
            total_std_dev: 0.0,
        };
    }

    let high_count = window.iter().filter(|r| r.outcome == Outcome::High).count();
    let low_count = len - high_count;

    let switches = window
        .windows(2)
        .filter(|pair| pair[0].outcome != pair[1].outcome)
        .count();
    let switch_rate = if len > 1 {
        switches as f64 / (len - 1) as f64
    } else {
        0.0
    };

    let mean_total = window.iter().map(|r| r.total as f64).sum::<f64>() / len as f64;
    let variance = window
        .iter()
        .map(|r| (r.total as f64 - mean_total).powi(2))
        .sum::<f64>()
        / len as f64;

    WindowStats {
        high_count,
        low_count,
        imbalance: high_count.abs_diff(low_count) as f64 / len as f64,
        switch_rate,
        mean_total,
        total_std_dev: variance.sqrt(),
    }
}

/// What historically followed the most recent n outcomes
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub pattern: Vec<Outcome>,
    pub outcome: Outcome,
    /// Share of occurrences that continued with `outcome`
    pub confidence: f64,
    pub occurrences: usize,
}

/// Minimum number of earlier occurrences before a pattern counts
pub const MIN_PATTERN_OCCURRENCES: usize = 2;

pub fn analyze_pattern(window: &[RoundResult], n: usize) -> Option<PatternMatch> {
    if n == 0 || window.len() < n + 1 {
        return None;
    }

    let outcomes: Vec<Outcome> = window.iter().map(|r| r.outcome).collect();
    let pattern = &outcomes[outcomes.len() - n..];

    let (mut high, mut low) = (0usize, 0usize);
    for i in 0..=outcomes.len() - (n + 1) {
        if &outcomes[i..i + n] == pattern {
            match outcomes[i + n] {
                Outcome::High => high += 1,
                Outcome::Low => low += 1,
            }
        }
    }

    let occurrences = high + low;
    if occurrences < MIN_PATTERN_OCCURRENCES {
        return None;
    }

    let (outcome, count) = if high > low {
        (Outcome::High, high)
    } else {
        (Outcome::Low, low)
    };

    Some(PatternMatch {
        pattern: pattern.to_vec(),
        outcome,
        confidence: count as f64 / occurrences as f64,
        occurrences,
    })
}

/// Render a pattern as `High-Low-High`
pub fn format_pattern(pattern: &[Outcome]) -> String {
    pattern
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
