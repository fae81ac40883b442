//! Market feed synchronizer for a currency exchange backend.
//!
//! Maintains a reconciled, bounded view of recent orders, recent trades and
//! candlesticks for one selected trading pair, fed by a historical fetch
//! over HTTP and a STOMP push subscription over WebSocket.

pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod reconcile;
pub mod rest;
pub mod selection;
pub mod tls;
pub mod websocket;

pub use error::{MarketSyncError, Result};
