//! WebSocket connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single broker connection. It connects,
//! performs the STOMP handshake, keeps heart-beats flowing, replays every
//! desired subscription after each (re)connect and reconnects after a
//! fixed delay whenever the transport is lost.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use tungstenite::Message as WsMessage;
use tungstenite::http::Uri;

use super::frame::{Command, Frame, Heartbeat};
use super::handler::{FeedEvent, parse_message};
use super::subscription::{ConnectionState, SubscriptionManager};
use super::{WsReader, WsWriter, connect, send_frame, send_frames};
use crate::config::{BackendConfig, FeedConfig};
use crate::models::{Topic, TopicKind};

/// Commands sent from the feed to the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// Make `Topic` live, replacing any topic of the same kind.
    Subscribe(Topic),
    /// Drop whatever topic of this kind is live.
    Unsubscribe(TopicKind),
    /// Disconnect cleanly and stop.
    Shutdown,
}

/// Why a session ended.
enum DisconnectReason {
    /// The connection was lost, errored, or went silent.
    ConnectionError,
    /// Shutdown was requested or the feed went away.
    Shutdown,
}

/// One wake-up of the session loop.
enum Step {
    Inbound(Option<Result<WsMessage, tungstenite::Error>>),
    Command(Option<ConnectionCommand>),
    HeartbeatDue,
    Silent,
}

/// Manages the broker connection including reconnection and subscription
/// replay.
pub struct ConnectionManager {
    url: String,
    host: String,
    auth_token: Option<String>,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    reconnect_delay: Duration,
    heartbeat: Duration,
    negotiated: Heartbeat,
    subscriptions: SubscriptionManager,
    tx: mpsc::UnboundedSender<FeedEvent>,
    cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[must_use]
    pub fn new(
        backend: &BackendConfig,
        feed: &FeedConfig,
        tls_config: Option<Arc<rustls::ClientConfig>>,
        tx: mpsc::UnboundedSender<FeedEvent>,
        cmd_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> Self {
        Self {
            url: backend.websocket_url.clone(),
            host: broker_host(&backend.websocket_url),
            auth_token: backend.auth_token.clone(),
            tls_config,
            reconnect_delay: feed.reconnect_delay,
            heartbeat: feed.heartbeat,
            negotiated: Heartbeat::default(),
            subscriptions: SubscriptionManager::new(),
            tx,
            cmd_rx,
        }
    }

    /// Runs the connection manager until shutdown.
    ///
    /// Connects to the broker, pumps messages, and reconnects after the
    /// configured delay on every disconnection. Commands received while
    /// disconnected are remembered and applied once connected.
    pub async fn run(mut self) {
        loop {
            self.subscriptions.on_connecting();
            if !self.publish_state() {
                return;
            }

            info!(url = %self.url, "Connecting to WebSocket");
            let reason = match connect(&self.url, self.tls_config.clone()).await {
                Ok((write, read)) => self.session(write, read).await,
                Err(e) => {
                    error!("Connection failed: {e}");
                    DisconnectReason::ConnectionError
                }
            };

            self.subscriptions.on_disconnected();
            self.negotiated = Heartbeat::default();
            let feed_alive = self.publish_state();

            match reason {
                DisconnectReason::Shutdown => {
                    info!("Connection manager shutting down");
                    return;
                }
                DisconnectReason::ConnectionError if feed_alive => {
                    info!(
                        delay_secs = self.reconnect_delay.as_secs(),
                        "Connection lost, waiting before reconnect"
                    );
                    if !self.wait_reconnect_delay().await {
                        info!("Connection manager shutting down");
                        return;
                    }
                }
                DisconnectReason::ConnectionError => return,
            }
        }
    }

    /// Sleeps for the reconnect delay while still accepting commands.
    /// Returns `false` if shutdown was requested meanwhile.
    async fn wait_reconnect_delay(&mut self) -> bool {
        let deadline = Instant::now() + self.reconnect_delay;
        loop {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => return true,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(ConnectionCommand::Subscribe(topic)) => {
                        self.subscriptions.subscribe(topic);
                    }
                    Some(ConnectionCommand::Unsubscribe(kind)) => {
                        self.subscriptions.unsubscribe(kind);
                    }
                    Some(ConnectionCommand::Shutdown) | None => return false,
                },
            }
        }
    }

    /// Drives one connected session until it ends.
    async fn session(&mut self, mut write: WsWriter, mut read: WsReader) -> DisconnectReason {
        let connect_frame = Frame::connect(&self.host, self.heartbeat, self.auth_token.as_deref());
        if let Err(e) = send_frame(&mut write, &connect_frame).await {
            warn!("Failed to send CONNECT: {e}");
            return DisconnectReason::ConnectionError;
        }

        let mut heartbeat_due: Option<Instant> = None;
        let mut last_received = Instant::now();

        loop {
            let read_deadline = self
                .negotiated
                .incoming
                .map(|period| last_received + period * 2);

            let step = tokio::select! {
                msg = read.next() => Step::Inbound(msg),
                cmd = self.cmd_rx.recv() => Step::Command(cmd),
                () = wait_until(heartbeat_due) => Step::HeartbeatDue,
                () = wait_until(read_deadline) => Step::Silent,
            };

            match step {
                Step::Inbound(Some(Ok(WsMessage::Text(text)))) => {
                    last_received = Instant::now();
                    for decoded in Frame::decode_each(&text) {
                        let frame = match decoded {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!("Dropping undecodable frame: {e}");
                                continue;
                            }
                        };
                        if let Some(reason) = self.handle_frame(&mut write, frame).await {
                            return reason;
                        }
                    }
                    if heartbeat_due.is_none() {
                        heartbeat_due = self.negotiated.outgoing.map(|p| Instant::now() + p);
                    }
                }
                Step::Inbound(Some(Ok(WsMessage::Close(close)))) => {
                    warn!(?close, "Broker closed the connection");
                    return DisconnectReason::ConnectionError;
                }
                // Binary/Ping/Pong frames
                Step::Inbound(Some(Ok(_))) => last_received = Instant::now(),
                Step::Inbound(Some(Err(e))) => {
                    warn!("WebSocket error: {e}");
                    return DisconnectReason::ConnectionError;
                }
                Step::Inbound(None) => {
                    warn!("WebSocket stream ended");
                    return DisconnectReason::ConnectionError;
                }
                Step::Command(Some(ConnectionCommand::Shutdown) | None) => {
                    self.close(&mut write).await;
                    return DisconnectReason::Shutdown;
                }
                Step::Command(Some(ConnectionCommand::Subscribe(topic))) => {
                    let frames = self.subscriptions.subscribe(topic);
                    if let Err(e) = send_frames(&mut write, &frames).await {
                        warn!("Failed to send subscription: {e}");
                        return DisconnectReason::ConnectionError;
                    }
                }
                Step::Command(Some(ConnectionCommand::Unsubscribe(kind))) => {
                    let frames = self.subscriptions.unsubscribe(kind);
                    if let Err(e) = send_frames(&mut write, &frames).await {
                        warn!("Failed to send unsubscription: {e}");
                        return DisconnectReason::ConnectionError;
                    }
                }
                Step::HeartbeatDue => {
                    if let Err(e) = write.send(WsMessage::Text("\n".to_string().into())).await {
                        warn!("Failed to send heart-beat: {e}");
                        return DisconnectReason::ConnectionError;
                    }
                    heartbeat_due = self.negotiated.outgoing.map(|p| Instant::now() + p);
                }
                Step::Silent => {
                    warn!("No data from broker within the heart-beat window");
                    return DisconnectReason::ConnectionError;
                }
            }
        }
    }

    /// Reacts to one inbound frame. Returns a reason when the session must
    /// end.
    async fn handle_frame(&mut self, write: &mut WsWriter, frame: Frame) -> Option<DisconnectReason> {
        match frame.command {
            Command::Connected => {
                self.negotiated = Heartbeat::negotiate(self.heartbeat, frame.header("heart-beat"));
                info!(
                    version = frame.header("version"),
                    outgoing_ms = self.negotiated.outgoing.map(|d| d.as_millis() as u64),
                    incoming_ms = self.negotiated.incoming.map(|d| d.as_millis() as u64),
                    "STOMP session established"
                );

                let frames = self.subscriptions.on_connected();
                if let Err(e) = send_frames(write, &frames).await {
                    warn!("Failed to replay subscriptions: {e}");
                    return Some(DisconnectReason::ConnectionError);
                }
                if !self.publish_state() {
                    return Some(DisconnectReason::Shutdown);
                }
                None
            }
            Command::Message => {
                let Some(id) = frame.header("subscription") else {
                    warn!("Dropping MESSAGE without subscription header");
                    return None;
                };
                let Some(kind) = self.subscriptions.topic_for(id).map(Topic::kind) else {
                    debug!(subscription = id, "Dropping MESSAGE for inactive subscription");
                    return None;
                };
                match parse_message(kind, &frame.body) {
                    Ok(event) => {
                        if self.tx.send(event).is_err() {
                            return Some(DisconnectReason::Shutdown);
                        }
                    }
                    Err(e) => {
                        warn!(topic = kind.as_str(), "Dropping malformed message: {e}");
                    }
                }
                None
            }
            Command::Error => {
                error!(
                    reason = frame.header("message"),
                    body = %frame.body,
                    "Broker sent ERROR"
                );
                Some(DisconnectReason::ConnectionError)
            }
            Command::Receipt => {
                debug!(receipt = frame.header("receipt-id"), "Received RECEIPT");
                None
            }
            other => {
                debug!(command = other.as_str(), "Ignoring unexpected frame");
                None
            }
        }
    }

    /// Sends DISCONNECT and closes the socket, ignoring failures.
    async fn close(&mut self, write: &mut WsWriter) {
        let frames = self.subscriptions.unsubscribe_all();
        let _ = send_frames(write, &frames).await;
        let _ = send_frame(write, &Frame::disconnect()).await;
        let _ = write.close().await;
    }

    /// Publishes the current state. Returns `false` if the feed has gone.
    fn publish_state(&self) -> bool {
        let state = self.subscriptions.state();
        info!(state = state.as_str(), "Connection state changed");
        if state == ConnectionState::Connected {
            debug!(active = self.subscriptions.active_count(), "Subscriptions live");
        }
        self.tx.send(FeedEvent::Connection(state)).is_ok()
    }
}

/// Completes at `deadline`, or never if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Extracts the virtual host sent in CONNECT from the broker URL.
fn broker_host(url: &str) -> String {
    url.parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}
