//! Snapshot publisher
//!
//! Recomputes the prediction after every settled round and keeps the latest
//! round plus prediction ready for readers. Reads never wait on the feed.

use crate::predictor::Predictor;
use sicbo_core::{Prediction, RoundObserver, RoundResult, Snapshot};
use sicbo_persistence::RollingHistory;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

pub struct SnapshotPublisher {
    history: Arc<RollingHistory>,
    predictor: Arc<dyn Predictor>,
    latest: RwLock<Snapshot>,
    updates: AtomicU64,
}

impl SnapshotPublisher {
    pub fn new(history: Arc<RollingHistory>, predictor: Arc<dyn Predictor>) -> Self {
        Self {
            history,
            predictor,
            latest: RwLock::new(Snapshot::default()),
            updates: AtomicU64::new(0),
        }
    }

    /// Latest published snapshot (default before the first round)
    pub fn current(&self) -> Snapshot {
        self.latest
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Run the predictor over the history as it is right now
    pub fn predict_now(&self) -> Prediction {
        self.predictor.predict(&self.history.snapshot())
    }

    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    /// Number of snapshots published so far
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl RoundObserver for SnapshotPublisher {
    fn round_settled(&self, round: &RoundResult) {
        let prediction = self.predict_now();
        debug!(
            "Prediction after {:?}: {} ({:.0}%)",
            round.session_id,
            prediction.outcome,
            prediction.confidence * 100.0
        );

        let snapshot = Snapshot::from_round(round, prediction);
        let mut latest = match self.latest.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *latest = snapshot;
        self.updates.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{FixedRandom, PredictorKind};
    use sicbo_core::{Outcome, PredictedOutcome, SessionId};

    fn publisher(kind: PredictorKind) -> (Arc<RollingHistory>, SnapshotPublisher) {
        let history = Arc::new(RollingHistory::default());
        let predictor = kind.build(Arc::new(FixedRandom(true)));
        (history.clone(), SnapshotPublisher::new(history, predictor))
    }

    fn commit(history: &RollingHistory, publisher: &SnapshotPublisher, round: RoundResult) {
        history.append(round.clone());
        publisher.round_settled(&round);
    }

    #[test]
    fn test_empty_before_first_round() {
        let (_, publisher) = publisher(PredictorKind::MultiSignal);
        let snapshot = publisher.current();
        assert!(snapshot.total.is_none());
        assert_eq!(snapshot.predictor_outcome, PredictedOutcome::Unknown);
        assert_eq!(publisher.updates(), 0);
    }

    #[test]
    fn test_one_update_per_round() {
        let (history, publisher) = publisher(PredictorKind::MultiSignal);
        let round = RoundResult::settle(Some(SessionId::new(9)), [6, 6, 1]);
        commit(&history, &publisher, round);

        let snapshot = publisher.current();
        assert_eq!(snapshot.session_id, Some(SessionId::new(9)));
        assert_eq!(snapshot.total, Some(13));
        assert_eq!(snapshot.outcome, Some(Outcome::High));
        assert_eq!(snapshot.predictor_outcome, PredictedOutcome::Unknown);
        assert_eq!(publisher.updates(), 1);
    }

    #[test]
    fn test_prediction_follows_history() {
        let (history, publisher) = publisher(PredictorKind::Streak);
        for id in 1..=5 {
            commit(
                &history,
                &publisher,
                RoundResult::settle(Some(SessionId::new(id)), [1, 2, 3]),
            );
        }

        let snapshot = publisher.current();
        assert_eq!(snapshot.session_id, Some(SessionId::new(5)));
        assert_eq!(snapshot.predictor_outcome, PredictedOutcome::Low);
        assert_eq!(snapshot.predictor_confidence, 0.85);
        assert_eq!(publisher.updates(), 5);
        assert_eq!(publisher.predictor_name(), "streak");
    }
}
