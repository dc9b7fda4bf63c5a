//! Multi-Signal Predictor - Weighted vote over streak, pattern, imbalance,
//! switch-rate and 1-1 signals
//!
//! Statistics and patterns look at the most recent window; the streak looks
//! at the whole history. Each triggered signal adds weight to one side and a
//! line to the rationale. High variance in totals scales both sides down.

use super::signals::{analyze_pattern, analyze_statistics, analyze_streak, format_pattern};
use super::Predictor;
use sicbo_core::{Outcome, Prediction, RoundResult};

/// Configuration for the multi-signal predictor
#[derive(Debug, Clone)]
pub struct MultiSignalConfig {
    /// Rounds in the statistics/pattern window, also the minimum history
    pub window: usize,
    /// Weight for betting against a run whose break probability exceeds 0.5
    pub streak_break_weight: f64,
    /// Weight for following a run otherwise
    pub streak_follow_weight: f64,
    pub pattern3_threshold: f64,
    pub pattern3_weight: f64,
    pub pattern2_threshold: f64,
    pub pattern2_weight: f64,
    pub imbalance_threshold: f64,
    pub imbalance_weight: f64,
    pub switch_rate_threshold: f64,
    pub switch_rate_weight: f64,
    pub alternation_weight: f64,
    pub volatility_threshold: f64,
    pub volatility_damping: f64,
    pub fallback_confidence: f64,
    pub max_confidence: f64,
}

impl Default for MultiSignalConfig {
    fn default() -> Self {
        Self {
            window: 20,
            streak_break_weight: 1.5,
            streak_follow_weight: 1.2,
            pattern3_threshold: 0.8,
            pattern3_weight: 1.2,
            pattern2_threshold: 0.7,
            pattern2_weight: 1.0,
            imbalance_threshold: 0.4,
            imbalance_weight: 0.8,
            switch_rate_threshold: 0.65,
            switch_rate_weight: 0.9,
            alternation_weight: 1.1,
            volatility_threshold: 3.0,
            volatility_damping: 0.7,
            fallback_confidence: 0.40,
            max_confidence: 0.95,
        }
    }
}

/// Accumulated weight per side
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Scores {
    high: f64,
    low: f64,
}

impl Scores {
    fn add(&mut self, outcome: Outcome, weight: f64) {
        match outcome {
            Outcome::High => self.high += weight,
            Outcome::Low => self.low += weight,
        }
    }

    fn scale(&mut self, factor: f64) {
        self.high *= factor;
        self.low *= factor;
    }
}

pub struct MultiSignalPredictor {
    config: MultiSignalConfig,
}

impl MultiSignalPredictor {
    pub fn new(config: MultiSignalConfig) -> Self {
        Self { config }
    }

    /// Pick a side and confidence from the final scores.
    ///
    /// Equal non-zero scores resolve to Low.
    fn decide(&self, scores: Scores, latest: Outcome) -> (Outcome, f64) {
        if scores.high == 0.0 && scores.low == 0.0 {
            return (latest.opposite(), self.config.fallback_confidence);
        }

        let outcome = if scores.high > scores.low {
            Outcome::High
        } else {
            Outcome::Low
        };
        let margin = (scores.high - scores.low).abs() / (scores.high + scores.low);
        let confidence = (0.5 + 0.45 * margin).min(self.config.max_confidence);
        (outcome, confidence)
    }
}

impl Default for MultiSignalPredictor {
    fn default() -> Self {
        Self::new(MultiSignalConfig::default())
    }
}

impl Predictor for MultiSignalPredictor {
    fn predict(&self, history: &[RoundResult]) -> Prediction {
        let required = self.min_history();
        let Some(latest) = history.last().filter(|_| history.len() >= required) else {
            return Prediction::unknown(required, history.len());
        };

        let cfg = &self.config;
        let window = &history[history.len() - cfg.window.min(history.len())..];
        let mut scores = Scores::default();
        let mut rationale = Vec::new();

        let streak = analyze_streak(history);
        if let Some(current) = streak.current.filter(|_| streak.length >= 3) {
            let p = streak.break_probability;
            if p > 0.5 {
                scores.add(current.opposite(), cfg.streak_break_weight * p);
                rationale.push(format!(
                    "{} streak of {} rounds, {:.0}% break chance: breaking to {}",
                    current,
                    streak.length,
                    p * 100.0,
                    current.opposite()
                ));
            } else {
                scores.add(current, cfg.streak_follow_weight * (1.0 - p));
                rationale.push(format!(
                    "{} streak of {} rounds, {:.0}% break chance: following",
                    current,
                    streak.length,
                    p * 100.0
                ));
            }
        }

        for (n, threshold, weight) in [
            (3, cfg.pattern3_threshold, cfg.pattern3_weight),
            (2, cfg.pattern2_threshold, cfg.pattern2_weight),
        ] {
            if let Some(found) = analyze_pattern(window, n) {
                if found.confidence > threshold {
                    scores.add(found.outcome, weight * found.confidence);
                    rationale.push(format!(
                        "Pattern [{}] seen {} times, usually followed by {} ({:.0}%)",
                        format_pattern(&found.pattern),
                        found.occurrences,
                        found.outcome,
                        found.confidence * 100.0
                    ));
                }
            }
        }

        let stats = analyze_statistics(window);
        if stats.imbalance > cfg.imbalance_threshold {
            if let Some(minority) = stats.minority() {
                scores.add(minority, cfg.imbalance_weight * stats.imbalance);
                rationale.push(format!(
                    "Imbalance {} High / {} Low over {} rounds: expecting {} to catch up",
                    stats.high_count,
                    stats.low_count,
                    window.len(),
                    minority
                ));
            }
        }

        if stats.switch_rate > cfg.switch_rate_threshold && streak.length == 1 {
            scores.add(latest.outcome.opposite(), cfg.switch_rate_weight);
            rationale.push(format!(
                "Switch rate {:.0}%: expecting a switch to {}",
                stats.switch_rate * 100.0,
                latest.outcome.opposite()
            ));
        }

        if let [a, b, c] = &history[history.len() - 3..] {
            let last3 = (a.outcome, b.outcome, c.outcome);
            if last3 == (Outcome::High, Outcome::Low, Outcome::High) {
                scores.add(Outcome::Low, cfg.alternation_weight);
                rationale.push("1-1 pattern High-Low-High: expecting Low".to_string());
            } else if last3 == (Outcome::Low, Outcome::High, Outcome::Low) {
                scores.add(Outcome::High, cfg.alternation_weight);
                rationale.push("1-1 pattern Low-High-Low: expecting High".to_string());
            }
        }

        if stats.total_std_dev > cfg.volatility_threshold {
            scores.scale(cfg.volatility_damping);
            rationale.push(format!(
                "High volatility (std dev {:.2}): scores damped",
                stats.total_std_dev
            ));
        }

        let (outcome, confidence) = self.decide(scores, latest.outcome);
        if scores.high == 0.0 && scores.low == 0.0 {
            rationale.push(format!(
                "No strong signal, betting against the latest {}",
                latest.outcome
            ));
        }

        Prediction::new(outcome, confidence, rationale)
    }

    fn name(&self) -> &str {
        "multi-signal"
    }

    fn min_history(&self) -> usize {
        self.config.window.max(3)
    }
}
