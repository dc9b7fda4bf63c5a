//! Application state shared with the HTTP handlers

use sicbo_engine::SnapshotPublisher;
use sicbo_networking::{ConnectionState, FeedHandle};
use sicbo_persistence::RollingHistory;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<RollingHistory>,
    pub publisher: Arc<SnapshotPublisher>,
    /// `None` until the feed task has been spawned
    pub feed: Option<FeedHandle>,
}

impl AppState {
    pub fn new(history: Arc<RollingHistory>, publisher: Arc<SnapshotPublisher>) -> Self {
        Self {
            history,
            publisher,
            feed: None,
        }
    }

    pub fn with_feed(mut self, feed: FeedHandle) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.feed
            .as_ref()
            .map(|f| f.state())
            .unwrap_or(ConnectionState::Disconnected)
    }
}
