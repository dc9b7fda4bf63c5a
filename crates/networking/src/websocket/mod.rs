//! WebSocket feed connection for real-time round updates

pub mod codec;
pub mod config;
pub mod heartbeat;
pub mod machine;
pub mod manager;

pub use codec::FeedEvent;
pub use config::FeedConfig;
pub use heartbeat::Heartbeat;
pub use machine::{ConnectionMachine, ReconnectTicket};
pub use manager::{spawn_feed, FeedContext, FeedHandle};

use serde::Serialize;
use std::fmt;

/// WebSocket connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
        }
    }
}
