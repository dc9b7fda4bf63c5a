//! Connection lifecycle state machine
//!
//! Pure bookkeeping: the machine consumes lifecycle events and answers with
//! the side effects the driver must perform. Timers are represented by
//! tickets so that at most one reconnect can ever be pending.

use super::ConnectionState;
use std::time::Duration;

/// Default delay before reconnecting after a close
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2500);

/// Identifies one scheduled reconnect. Only the most recent ticket is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReconnectTicket(u64);

/// Lifecycle input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Start (or restart) a connection attempt
    Connect,
    /// The channel finished its handshake
    Opened,
    /// The peer closed the channel
    Closed,
    /// Transport-level failure, including a failed connect
    Failed(String),
    /// The driver finished closing the channel
    ChannelReleased,
    ReconnectFired(ReconnectTicket),
    Shutdown,
}

/// Side effect requested from the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Detach and force-close the current channel without reporting back
    Teardown,
    OpenChannel,
    ReplaySubscriptions,
    StartHeartbeat,
    StopHeartbeat,
    /// Close the current channel, then answer with `Event::ChannelReleased`
    CloseChannel,
    CancelReconnect(ReconnectTicket),
    ScheduleReconnect {
        ticket: ReconnectTicket,
        delay: Duration,
    },
}

#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    channel_active: bool,
    heartbeat_running: bool,
    pending_reconnect: Option<ReconnectTicket>,
    next_ticket: u64,
    reconnect_delay: Duration,
    attempts: u64,
    stopped: bool,
}

impl ConnectionMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            channel_active: false,
            heartbeat_running: false,
            pending_reconnect: None,
            next_ticket: 0,
            reconnect_delay,
            attempts: 0,
            stopped: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn pending_reconnect(&self) -> Option<ReconnectTicket> {
        self.pending_reconnect
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat_running
    }

    /// Connection attempts started so far
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        if self.stopped {
            return Vec::new();
        }

        let mut actions = Vec::new();
        match event {
            Event::Connect => self.begin_connect(&mut actions),
            Event::Opened => {
                if self.state == ConnectionState::Connecting {
                    self.state = ConnectionState::Open;
                    self.channel_active = true;
                    self.heartbeat_running = true;
                    actions.push(Action::ReplaySubscriptions);
                    actions.push(Action::StartHeartbeat);
                }
            }
            Event::Closed | Event::Failed(_) => {
                self.stop_heartbeat(&mut actions);
                if self.channel_active {
                    self.state = ConnectionState::Closing;
                    actions.push(Action::CloseChannel);
                } else {
                    self.state = ConnectionState::Disconnected;
                    self.schedule_reconnect(&mut actions);
                }
            }
            Event::ChannelReleased => {
                if self.state == ConnectionState::Closing {
                    self.channel_active = false;
                    self.state = ConnectionState::Disconnected;
                    self.schedule_reconnect(&mut actions);
                }
            }
            Event::ReconnectFired(ticket) => {
                if self.pending_reconnect == Some(ticket) {
                    self.pending_reconnect = None;
                    self.begin_connect(&mut actions);
                }
            }
            Event::Shutdown => {
                self.stop_heartbeat(&mut actions);
                if self.channel_active {
                    self.channel_active = false;
                    actions.push(Action::Teardown);
                }
                if let Some(ticket) = self.pending_reconnect.take() {
                    actions.push(Action::CancelReconnect(ticket));
                }
                self.state = ConnectionState::Disconnected;
                self.stopped = true;
            }
        }
        actions
    }

    fn begin_connect(&mut self, actions: &mut Vec<Action>) {
        self.stop_heartbeat(actions);
        if self.channel_active {
            self.channel_active = false;
            actions.push(Action::Teardown);
        }
        if let Some(ticket) = self.pending_reconnect.take() {
            actions.push(Action::CancelReconnect(ticket));
        }
        self.attempts += 1;
        self.state = ConnectionState::Connecting;
        actions.push(Action::OpenChannel);
    }

    fn stop_heartbeat(&mut self, actions: &mut Vec<Action>) {
        if self.heartbeat_running {
            self.heartbeat_running = false;
            actions.push(Action::StopHeartbeat);
        }
    }

    fn schedule_reconnect(&mut self, actions: &mut Vec<Action>) {
        if let Some(previous) = self.pending_reconnect.take() {
            actions.push(Action::CancelReconnect(previous));
        }
        self.next_ticket += 1;
        let ticket = ReconnectTicket(self.next_ticket);
        self.pending_reconnect = Some(ticket);
        actions.push(Action::ScheduleReconnect {
            ticket,
            delay: self.reconnect_delay,
        });
    }
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}
