//! Crate-level error types.
//!
//! [`MarketSyncError`] unifies every error source (configuration, transport,
//! HTTP, JSON, STOMP framing) behind a single enum so callers can match on
//! the variant they care about while still using the `?` operator.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarketSyncError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum MarketSyncError {
    /// A configuration value is missing, malformed, or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// An HTTP request failed or returned a non-success status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The TLS configuration could not be built.
    #[error("tls error: {0}")]
    Tls(String),

    /// A STOMP frame could not be decoded.
    #[error("stomp frame error: {0}")]
    Frame(String),

    /// A push payload decoded but violates the entity contract.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}
