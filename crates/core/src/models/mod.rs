//! Data models for rounds, predictions and published snapshots

mod prediction;
mod round;
mod snapshot;

pub use prediction::*;
pub use round::*;
pub use snapshot::*;
