//! Feed connection configuration

use super::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
use super::machine::DEFAULT_RECONNECT_DELAY;
use serde_json::{json, Value};
use sicbo_core::{Error, Result};
use std::time::Duration;

/// Browser `User-Agent` sent with the upgrade request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
/// Origin the game client is served from
pub const DEFAULT_ORIGIN: &str = "https://play.sun.win";

/// Delay between consecutive subscription steps after the channel opens
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(600);

/// Configuration for the upstream feed connection
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket URL, including any access token query
    pub url: String,
    /// `Origin` header sent with the upgrade request
    pub origin: String,
    /// `User-Agent` header sent with the upgrade request
    pub user_agent: String,
    /// Frames replayed in order after every successful open
    pub subscription_steps: Vec<Value>,
    pub step_delay: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Prepend a login frame to the subscription sequence
    pub fn with_login_frame(mut self, frame: Value) -> Self {
        self.subscription_steps.insert(0, frame);
        self
    }

    /// Check the config before a connection is attempted
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "feed url must use ws:// or wss://, got '{}'",
                self.url
            )));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(Error::Config("heartbeat interval must be non-zero".to_string()));
        }
        if let Some(step) = self.subscription_steps.iter().find(|s| !s.is_array()) {
            return Err(Error::Config(format!(
                "subscription step must be a JSON array, got {}",
                step
            )));
        }
        Ok(())
    }
}

/// Plugin subscriptions for the dice game and the lobby
pub fn default_subscription_steps() -> Vec<Value> {
    vec![
        json!([6, "MiniGame", "taixiuPlugin", { "cmd": 1005 }]),
        json!([6, "MiniGame", "lobbyPlugin", { "cmd": 10001 }]),
    ]
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            origin: DEFAULT_ORIGIN.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            subscription_steps: default_subscription_steps(),
            step_delay: DEFAULT_STEP_DELAY,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}
