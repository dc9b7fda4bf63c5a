//! Sicbo Networking - WebSocket feed connection, frame codec, and heartbeat

pub mod websocket;

pub use websocket::{spawn_feed, ConnectionState, FeedConfig, FeedContext, FeedHandle};
