//! Inbound push message decoding.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::subscription::ConnectionState;
use crate::Result;
use crate::models::{Candlestick, PrivateTrade, PublicOrder, PublicTrade, TopicKind};

/// A validated event delivered to the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The transport changed state.
    Connection(ConnectionState),
    /// One or more public trades, in arrival order.
    Trades(Vec<PublicTrade>),
    /// One or more order updates, in arrival order.
    Orders(Vec<PublicOrder>),
    Candle(Candlestick),
    PrivateTrades(Vec<PrivateTrade>),
}

/// The backend publishes either a single entity or a batch.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn decode_batch<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let batch: OneOrMany<T> = serde_json::from_str(body)?;
    Ok(batch.into_vec())
}

/// Decodes and validates a MESSAGE body received on a topic of `kind`.
///
/// # Errors
///
/// Returns [`MarketSyncError::Json`](crate::MarketSyncError::Json) if the
/// body has the wrong shape, or
/// [`MarketSyncError::MalformedMessage`](crate::MarketSyncError::MalformedMessage)
/// if any entity fails validation. A batch is rejected as a whole.
pub fn parse_message(kind: TopicKind, body: &str) -> Result<FeedEvent> {
    match kind {
        TopicKind::PublicTrades => {
            let trades: Vec<PublicTrade> = decode_batch(body)?;
            trades.iter().try_for_each(PublicTrade::validate)?;
            Ok(FeedEvent::Trades(trades))
        }
        TopicKind::RecentOrders => {
            let orders: Vec<PublicOrder> = decode_batch(body)?;
            orders.iter().try_for_each(PublicOrder::validate)?;
            Ok(FeedEvent::Orders(orders))
        }
        TopicKind::Candles => {
            let candle: Candlestick = serde_json::from_str(body)?;
            candle.validate()?;
            Ok(FeedEvent::Candle(candle))
        }
        TopicKind::PrivateTrades => {
            let trades: Vec<PrivateTrade> = decode_batch(body)?;
            trades.iter().try_for_each(PrivateTrade::validate)?;
            Ok(FeedEvent::PrivateTrades(trades))
        }
    }
}
