//! STOMP-over-WebSocket push client.
//!
//! This module is organized by concern:
//! - [`frame`] - STOMP frame codec and heart-beat negotiation
//! - [`subscription`] - Desired/active subscription state machine
//! - [`handler`] - Push payload decoding into feed events
//! - [`connection`] - Transport lifecycle and reconnection

pub mod connection;
pub mod frame;
pub mod handler;
pub mod subscription;

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;

pub use connection::{ConnectionCommand, ConnectionManager};
pub use frame::{Command, Frame, Heartbeat};
pub use handler::{FeedEvent, parse_message};
pub use subscription::{ConnectionState, SubscriptionManager};

/// Write half of a broker WebSocket connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of a broker WebSocket connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Establishes a WebSocket connection to `url`, trusting only the roots in
/// `tls_config` when one is given.
///
/// # Errors
///
/// Returns a [`MarketSyncError`](crate::MarketSyncError) if the connection or TLS handshake fails.
pub async fn connect(
    url: &str,
    tls_config: Option<Arc<rustls::ClientConfig>>,
) -> Result<(WsWriter, WsReader)> {
    let connector = tls_config.map(Connector::Rustls);
    let (ws_stream, _) =
        tokio_tungstenite::connect_async_tls_with_config(url, None, false, connector).await?;
    info!("WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Encodes and sends a single STOMP frame.
///
/// # Errors
///
/// Returns a [`MarketSyncError`](crate::MarketSyncError) if sending the message fails.
pub async fn send_frame(write: &mut WsWriter, frame: &Frame) -> Result<()> {
    write.send(Message::Text(frame.encode().into())).await?;
    debug!(command = frame.command.as_str(), "Sent frame");

    Ok(())
}

/// Sends `frames` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns a [`MarketSyncError`](crate::MarketSyncError) if sending any frame fails.
pub async fn send_frames(write: &mut WsWriter, frames: &[Frame]) -> Result<()> {
    for frame in frames {
        send_frame(write, frame).await?;
    }
    Ok(())
}
