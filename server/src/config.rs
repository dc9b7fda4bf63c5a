//! Process configuration read from the environment

use sicbo_core::{Error, Result};
use sicbo_engine::PredictorKind;
use sicbo_networking::FeedConfig;
use sicbo_persistence::DEFAULT_CAPACITY;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

/// Default HTTP port for the snapshot endpoint
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub feed: FeedConfig,
    pub predictor: PredictorKind,
    pub history_capacity: usize,
}

impl ServerConfig {
    /// Read from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read using an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = get("SICBO_FEED_URL")
            .ok_or_else(|| Error::Config("SICBO_FEED_URL is not set".to_string()))?;
        let mut feed = FeedConfig::new(url.trim());

        if let Some(origin) = get("SICBO_FEED_ORIGIN") {
            feed.origin = origin;
        }
        if let Some(user_agent) = get("SICBO_FEED_USER_AGENT") {
            feed.user_agent = user_agent;
        }
        if let Some(frame) = get("SICBO_LOGIN_FRAME") {
            let frame = serde_json::from_str(&frame)
                .map_err(|e| Error::Config(format!("SICBO_LOGIN_FRAME is not valid JSON: {}", e)))?;
            feed = feed.with_login_frame(frame);
        }
        if let Some(ms) = parse::<u64>(&get, "SICBO_RECONNECT_MS")? {
            feed.reconnect_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse::<u64>(&get, "SICBO_HEARTBEAT_SECS")? {
            feed.heartbeat_interval = Duration::from_secs(secs);
        }
        feed.validate()?;

        let predictor = match get("SICBO_PREDICTOR") {
            Some(kind) => kind.parse()?,
            None => PredictorKind::default(),
        };

        Ok(Self {
            bind: parse(&get, "SICBO_BIND")?.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: parse(&get, "PORT")?.unwrap_or(DEFAULT_PORT),
            feed,
            predictor,
            history_capacity: parse(&get, "SICBO_HISTORY_CAPACITY")?.unwrap_or(DEFAULT_CAPACITY),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e)))
        })
        .transpose()
}
