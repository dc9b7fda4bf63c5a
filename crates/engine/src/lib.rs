//! Sicbo Engine - Next-round prediction and snapshot publishing

pub mod predictor;
pub mod publisher;

pub use predictor::{Predictor, PredictorKind};
pub use publisher::SnapshotPublisher;
