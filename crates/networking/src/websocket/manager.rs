//! Feed connection manager
//!
//! A single Tokio task owns the socket, the heartbeat, the subscription
//! replay queue and the reconnect timer. Every wake-up is turned into a
//! [`ConnectionMachine`] event, and the machine decides what happens next.

use super::codec::{self, FeedEvent};
use super::config::FeedConfig;
use super::heartbeat::Heartbeat;
use super::machine::{Action, ConnectionMachine, Event, ReconnectTicket};
use super::ConnectionState;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use sicbo_core::{Error, Result, RoundObserver, RoundResult, SessionId};
use sicbo_persistence::RollingHistory;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant, Sleep};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, ORIGIN, USER_AGENT};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound for a graceful close handshake before the socket is dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// State the feed task mutates when frames arrive
pub struct FeedContext {
    history: Arc<RollingHistory>,
    pending_session: Option<SessionId>,
    observer: Option<Arc<dyn RoundObserver>>,
}

impl FeedContext {
    pub fn new(history: Arc<RollingHistory>) -> Self {
        Self {
            history,
            pending_session: None,
            observer: None,
        }
    }

    /// Notify `observer` after every committed round
    pub fn with_observer(mut self, observer: Arc<dyn RoundObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn pending_session(&self) -> Option<SessionId> {
        self.pending_session
    }

    /// Apply a decoded frame. Returns the round if one was committed.
    pub fn apply(&mut self, event: FeedEvent) -> Option<RoundResult> {
        match event {
            FeedEvent::SessionOpened { session_id } => {
                debug!("Session #{} opened", session_id);
                self.pending_session = Some(session_id);
                None
            }
            FeedEvent::RoundSettled { dice } => {
                let round = RoundResult::settle(self.pending_session.take(), dice);
                self.history.append(round.clone());
                if let Some(observer) = &self.observer {
                    observer.round_settled(&round);
                }
                Some(round)
            }
            FeedEvent::Unrecognized => None,
        }
    }
}

#[derive(Debug, Default)]
struct FeedStats {
    rounds_seen: AtomicU64,
    reconnects: AtomicU64,
    decode_errors: AtomicU64,
}

/// Handle to observe and stop the feed task
#[derive(Clone)]
pub struct FeedHandle {
    cancel_token: CancellationToken,
    state_rx: watch::Receiver<ConnectionState>,
    stats: Arc<FeedStats>,
}

impl FeedHandle {
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Wait until the connection reaches `state`
    pub async fn wait_for(&self, state: ConnectionState) -> Result<()> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|s| *s == state)
            .await
            .map(|_| ())
            .map_err(|_| Error::Unknown("feed task exited".to_string()))
    }

    /// Settled rounds committed since start
    pub fn rounds_seen(&self) -> u64 {
        self.stats.rounds_seen.load(Ordering::Relaxed)
    }

    /// Connection attempts made after the first one
    pub fn reconnects(&self) -> u64 {
        self.stats.reconnects.load(Ordering::Relaxed)
    }

    /// Frames that failed to parse
    pub fn decode_errors(&self) -> u64 {
        self.stats.decode_errors.load(Ordering::Relaxed)
    }

    /// Stop the feed task for good (cannot be restarted, spawn a new one)
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
        info!("Feed shutdown requested");
    }
}

/// Spawn the feed connection task.
///
/// Returns a handle to observe connection state and stop the task.
pub fn spawn_feed(config: FeedConfig, context: FeedContext) -> FeedHandle {
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let cancel_token = CancellationToken::new();
    let stats = Arc::new(FeedStats::default());

    let handle = FeedHandle {
        cancel_token: cancel_token.clone(),
        state_rx,
        stats: stats.clone(),
    };

    let manager = FeedManager {
        machine: ConnectionMachine::new(config.reconnect_delay),
        config,
        context,
        sink: None,
        stream: None,
        heartbeat: None,
        replay: VecDeque::new(),
        reconnect: None,
        cancel_token,
        state_tx,
        stats,
    };
    tokio::spawn(manager.run());

    handle
}

enum Wake {
    Cancelled,
    Frame(Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Heartbeat(u64),
    StepDue,
    ReconnectDue(ReconnectTicket),
}

struct FeedManager {
    config: FeedConfig,
    machine: ConnectionMachine,
    context: FeedContext,
    sink: Option<SplitSink<WsStream, Message>>,
    stream: Option<SplitStream<WsStream>>,
    heartbeat: Option<Heartbeat>,
    /// Subscription steps still to send: (due time, step index)
    replay: VecDeque<(Instant, usize)>,
    reconnect: Option<(ReconnectTicket, Pin<Box<Sleep>>)>,
    cancel_token: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
    stats: Arc<FeedStats>,
}

impl FeedManager {
    async fn run(mut self) {
        info!("Feed manager started ({})", strip_query(&self.config.url));
        self.dispatch(Event::Connect).await;

        loop {
            let wake = tokio::select! {
                _ = self.cancel_token.cancelled() => Wake::Cancelled,
                frame = next_frame(&mut self.stream) => Wake::Frame(frame),
                seq = next_heartbeat(&mut self.heartbeat) => Wake::Heartbeat(seq),
                _ = step_due(self.replay.front().map(|(at, _)| *at)) => Wake::StepDue,
                ticket = reconnect_due(&mut self.reconnect) => Wake::ReconnectDue(ticket),
            };

            match wake {
                Wake::Cancelled => {
                    self.dispatch(Event::Shutdown).await;
                    break;
                }
                Wake::Frame(Some(Ok(message))) => {
                    if let Some(event) = self.on_message(message) {
                        self.dispatch(event).await;
                    }
                }
                Wake::Frame(Some(Err(e))) => {
                    warn!("WebSocket error: {}", e);
                    self.dispatch(Event::Failed(e.to_string())).await;
                }
                Wake::Frame(None) => {
                    info!("WebSocket stream ended");
                    self.dispatch(Event::Closed).await;
                }
                Wake::Heartbeat(seq) => self.send_ping(seq).await,
                Wake::StepDue => self.send_next_step().await,
                Wake::ReconnectDue(ticket) => {
                    self.reconnect = None;
                    self.dispatch(Event::ReconnectFired(ticket)).await;
                }
            }
        }

        info!("Feed manager exited");
    }

    /// Feed an event through the machine and perform the resulting actions,
    /// including any follow-up events they produce.
    async fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for action in self.machine.handle(event) {
                if let Some(follow_up) = self.execute(action).await {
                    queue.push_back(follow_up);
                }
            }
            self.publish_state();
        }
    }

    async fn execute(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::Teardown => {
                self.close_channel().await;
                None
            }
            Action::CloseChannel => {
                self.close_channel().await;
                Some(Event::ChannelReleased)
            }
            Action::OpenChannel => {
                self.publish_state();
                if self.machine.attempts() > 1 {
                    self.stats.reconnects.fetch_add(1, Ordering::Relaxed);
                }

                let result = tokio::select! {
                    _ = self.cancel_token.cancelled() => return Some(Event::Shutdown),
                    result = connect(&self.config) => result,
                };

                match result {
                    Ok(ws) => {
                        info!("WebSocket connected");
                        let (sink, stream) = ws.split();
                        self.sink = Some(sink);
                        self.stream = Some(stream);
                        Some(Event::Opened)
                    }
                    Err(e) => {
                        warn!("WebSocket connect failed: {}", e);
                        Some(Event::Failed(e.to_string()))
                    }
                }
            }
            Action::ReplaySubscriptions => {
                let now = Instant::now();
                self.replay = (0..self.config.subscription_steps.len())
                    .map(|i| (now + self.config.step_delay * i as u32, i))
                    .collect();
                None
            }
            Action::StartHeartbeat => {
                self.heartbeat = Some(Heartbeat::start(self.config.heartbeat_interval));
                None
            }
            Action::StopHeartbeat => {
                self.heartbeat = None;
                None
            }
            Action::CancelReconnect(ticket) => {
                if self.reconnect.as_ref().is_some_and(|(t, _)| *t == ticket) {
                    self.reconnect = None;
                }
                None
            }
            Action::ScheduleReconnect { ticket, delay } => {
                info!("Reconnecting in {:?}", delay);
                self.reconnect = Some((ticket, Box::pin(sleep(delay))));
                None
            }
        }
    }

    fn on_message(&mut self, message: Message) -> Option<Event> {
        match message {
            Message::Text(text) => self.on_text(&text),
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.on_text(text),
                Err(_) => debug!("Ignoring non-UTF-8 binary frame ({} bytes)", bytes.len()),
            },
            Message::Pong(_) => debug!("Ping OK"),
            Message::Ping(_) | Message::Frame(_) => {}
            Message::Close(frame) => {
                match frame {
                    Some(f) => info!("WebSocket closed. Code: {}, Reason: {}", f.code, f.reason),
                    None => info!("WebSocket closed"),
                }
                return Some(Event::Closed);
            }
        }
        None
    }

    fn on_text(&mut self, text: &str) {
        match codec::decode_text(text) {
            Ok(event) => {
                if let Some(round) = self.context.apply(event) {
                    self.stats.rounds_seen.fetch_add(1, Ordering::Relaxed);
                    let session = round
                        .session_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "?".to_string());
                    info!(
                        "Session #{}: {}-{}-{} -> total {} ({})",
                        session, round.dice1, round.dice2, round.dice3, round.total, round.outcome
                    );
                }
            }
            Err(e) => {
                self.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to process message: {}", e);
            }
        }
    }

    async fn send_next_step(&mut self) {
        let Some((_, index)) = self.replay.pop_front() else {
            return;
        };
        if self.machine.state() != ConnectionState::Open {
            debug!("Skipping subscription step {}: channel not open", index);
            return;
        }

        let frame = codec::encode_step(&self.config.subscription_steps[index]);
        if let Err(e) = self.send(Message::Text(frame)).await {
            warn!("Failed to send subscription step {}: {}", index, e);
            self.dispatch(Event::Failed(e.to_string())).await;
        } else {
            debug!("Sent subscription step {}", index);
        }
    }

    async fn send_ping(&mut self, seq: u64) {
        if self.machine.state() != ConnectionState::Open {
            return;
        }
        if let Err(e) = self.send(Message::Ping(Vec::new())).await {
            warn!("Failed to send ping #{}: {}", seq, e);
            self.dispatch(Event::Failed(e.to_string())).await;
        }
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| Error::NetworkError("no open channel".to_string()))?;
        sink.send(message).await?;
        Ok(())
    }

    /// Best-effort close; the socket is dropped either way
    async fn close_channel(&mut self) {
        self.replay.clear();
        self.stream = None;
        if let Some(mut sink) = self.sink.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
                debug!("Close handshake timed out");
            }
        }
    }

    fn publish_state(&self) {
        let state = self.machine.state();
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state {:?} -> {:?}", previous, state);
        }
    }
}

#[instrument(skip(config), fields(url = %strip_query(&config.url)))]
async fn connect(config: &FeedConfig) -> Result<WsStream> {
    let mut request = config.url.as_str().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).map_err(|e| Error::Config(e.to_string()))?,
    );
    headers.insert(
        ORIGIN,
        HeaderValue::from_str(&config.origin).map_err(|e| Error::Config(e.to_string()))?,
    );

    let (ws, response) = connect_async(request).await?;
    debug!("Handshake response status: {}", response.status());
    Ok(ws)
}

/// Keep access tokens out of the logs
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

async fn next_frame(
    stream: &mut Option<SplitStream<WsStream>>,
) -> Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Heartbeat>) -> u64 {
    match heartbeat {
        Some(heartbeat) => heartbeat.tick().await,
        None => std::future::pending().await,
    }
}

async fn step_due(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn reconnect_due(slot: &mut Option<(ReconnectTicket, Pin<Box<Sleep>>)>) -> ReconnectTicket {
    match slot {
        Some((ticket, timer)) => {
            timer.as_mut().await;
            *ticket
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sicbo_core::Outcome;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_tungstenite::accept_async;

    #[derive(Default)]
    struct Recorder {
        rounds: Mutex<Vec<RoundResult>>,
    }

    impl RoundObserver for Recorder {
        fn round_settled(&self, round: &RoundResult) {
            self.rounds.lock().unwrap().push(round.clone());
        }
    }

    fn test_config(addr: std::net::SocketAddr) -> FeedConfig {
        FeedConfig {
            url: format!("ws://{}/websocket?token=test", addr),
            step_delay: Duration::from_millis(10),
            heartbeat_interval: Duration::from_millis(100),
            reconnect_delay: Duration::from_millis(50),
            ..FeedConfig::default()
        }
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[test]
    fn test_context_attaches_and_clears_pending_session() {
        let history = Arc::new(RollingHistory::default());
        let recorder = Arc::new(Recorder::default());
        let mut context = FeedContext::new(history.clone()).with_observer(recorder.clone());

        context.apply(FeedEvent::SessionOpened {
            session_id: SessionId::new(10),
        });
        assert_eq!(context.pending_session(), Some(SessionId::new(10)));

        let round = context
            .apply(FeedEvent::RoundSettled { dice: [2, 2, 2] })
            .unwrap();
        assert_eq!(round.session_id, Some(SessionId::new(10)));
        assert_eq!(round.outcome, Outcome::Low);
        assert!(context.pending_session().is_none());

        // Settlement without an announcement carries no session id
        let round = context
            .apply(FeedEvent::RoundSettled { dice: [6, 6, 6] })
            .unwrap();
        assert!(round.session_id.is_none());

        assert_eq!(history.len(), 2);
        assert_eq!(recorder.rounds.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_context_ignores_unrecognized_frames() {
        let history = Arc::new(RollingHistory::default());
        let mut context = FeedContext::new(history.clone());
        let event = codec::classify(&json!([5, {"cmd": 1003, "gBB": true, "d1": null, "d2": 1, "d3": 1}]));

        assert!(context.apply(event).is_none());

        let event = codec::decode_text(
            r#"[5,{"cmd":1003,"gBB":true,"d1":9223372036854775807,"d2":1,"d3":1}]"#,
        )
        .unwrap();
        assert!(context.apply(event).is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn test_strip_query_hides_token() {
        assert_eq!(
            strip_query("wss://feed.example/websocket?token=secret"),
            "wss://feed.example/websocket"
        );
    }

    #[tokio::test]
    async fn test_replays_steps_and_commits_settled_round() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (steps_tx, mut steps_rx) = mpsc::unbounded_channel::<String>();
        let pings = Arc::new(AtomicU64::new(0));
        let server_pings = pings.clone();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let mut received = 0;
            while received < 2 {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        received += 1;
                        steps_tx.send(text).unwrap();
                    }
                    Some(Ok(_)) => {}
                    _ => return,
                }
            }

            for frame in [
                json!([5, {"cmd": 1008, "sid": 42}]),
                json!([5, {"cmd": 1003, "gBB": true, "d1": null, "d2": 3, "d3": 3}]),
                json!([5, {"cmd": 1003, "gBB": true, "d1": i64::MAX, "d2": 1, "d3": 1}]),
                json!([5, {"cmd": 1003, "gBB": true, "d1": 6, "d2": 5, "d3": 4}]),
            ] {
                ws.send(Message::Text(frame.to_string())).await.unwrap();
            }
            ws.send(Message::Text("not json".to_string())).await.unwrap();

            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Ping(_)) {
                    server_pings.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        let history = Arc::new(RollingHistory::default());
        let recorder = Arc::new(Recorder::default());
        let context = FeedContext::new(history.clone()).with_observer(recorder.clone());
        let handle = spawn_feed(test_config(addr), context);

        let first = steps_rx.recv().await.unwrap();
        let second = steps_rx.recv().await.unwrap();
        assert!(first.contains("taixiuPlugin"));
        assert!(second.contains("lobbyPlugin"));

        wait_until(|| handle.rounds_seen() == 1).await;
        let round = history.latest().unwrap();
        assert_eq!(round.session_id, Some(SessionId::new(42)));
        assert_eq!(round.total, 15);
        assert_eq!(round.outcome, Outcome::High);
        assert_eq!(history.len(), 1);
        assert_eq!(recorder.rounds.lock().unwrap().len(), 1);
        assert_eq!(handle.state(), ConnectionState::Open);

        wait_until(|| handle.decode_errors() == 1).await;
        wait_until(|| pings.load(Ordering::Relaxed) >= 1).await;

        handle.shutdown();
        handle.wait_for(ConnectionState::Disconnected).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnects_after_server_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel::<usize>();

        tokio::spawn(async move {
            for n in 1..=2 {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(tcp).await.unwrap();
                accepted_tx.send(n).unwrap();
                if n == 1 {
                    ws.close(None).await.ok();
                    while let Some(Ok(_)) = ws.next().await {}
                } else {
                    while let Some(Ok(_)) = ws.next().await {}
                }
            }
        });

        let history = Arc::new(RollingHistory::default());
        let handle = spawn_feed(test_config(addr), FeedContext::new(history));

        assert_eq!(accepted_rx.recv().await, Some(1));
        let second = tokio::time::timeout(Duration::from_secs(5), accepted_rx.recv())
            .await
            .unwrap();
        assert_eq!(second, Some(2));

        wait_until(|| handle.reconnects() == 1 && handle.state() == ConnectionState::Open).await;

        handle.shutdown();
        handle.wait_for(ConnectionState::Disconnected).await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_steps_dropped_on_close_and_replayed_from_start() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (steps_tx, mut steps_rx) = mpsc::unbounded_channel::<(usize, String)>();

        tokio::spawn(async move {
            for n in 1..=2 {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(tcp).await.unwrap();
                let mut closed = false;
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        steps_tx.send((n, text)).unwrap();
                        // Drop the first connection as soon as step 0 lands
                        if n == 1 && !closed {
                            closed = true;
                            ws.close(None).await.ok();
                        }
                    }
                }
            }
        });

        let config = FeedConfig {
            step_delay: Duration::from_millis(300),
            ..test_config(addr)
        };
        let handle = spawn_feed(config, FeedContext::new(Arc::new(RollingHistory::default())));

        let mut received = Vec::new();
        while received.len() < 3 {
            let step = tokio::time::timeout(Duration::from_secs(5), steps_rx.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(step);
        }

        // Connection 1 is fully drained before connection 2 is accepted, so a
        // late step on the first socket would show up here as (1, lobby)
        assert_eq!(received[0].0, 1);
        assert!(received[0].1.contains("taixiuPlugin"));
        assert_eq!(received[1].0, 2);
        assert!(received[1].1.contains("taixiuPlugin"));
        assert_eq!(received[2].0, 2);
        assert!(received[2].1.contains("lobbyPlugin"));

        sleep(Duration::from_millis(400)).await;
        assert!(steps_rx.try_recv().is_err());
        assert_eq!(handle.reconnects(), 1);

        handle.shutdown();
        handle.wait_for(ConnectionState::Disconnected).await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_keeps_retrying() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let history = Arc::new(RollingHistory::default());
        let handle = spawn_feed(test_config(addr), FeedContext::new(history));

        wait_until(|| handle.reconnects() >= 2).await;
        assert_ne!(handle.state(), ConnectionState::Open);

        handle.shutdown();
        handle.wait_for(ConnectionState::Disconnected).await.unwrap();
    }
}
