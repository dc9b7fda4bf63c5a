//! Periodic liveness pings for an open connection

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Default ping interval
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Fires once per period while alive; dropping it stops the schedule.
///
/// Replies are informational only. A dead peer is noticed through the
/// transport's own close/error signal, never by this timer.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Interval,
    sent: u64,
}

impl Heartbeat {
    /// Start a schedule whose first ping is due one full period from now
    pub fn start(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, sent: 0 }
    }

    /// Wait for the next ping slot. Returns the ping sequence number.
    pub async fn tick(&mut self) -> u64 {
        self.interval.tick().await;
        self.sent += 1;
        self.sent
    }
}
