//! Shared models for the exchange backend's REST and push payloads.
//!
//! Contains the entity types exchanged with the backend and the topic
//! addressing used for push subscriptions.

pub mod candle;
pub mod order;
pub mod page;
pub mod pair;
pub mod trade;
pub mod volume;

use serde::{Deserialize, Serialize};

pub use candle::Candlestick;
pub use order::{OrderStatus, OrderType, PublicOrder};
pub use page::Page;
pub use pair::TradingPair;
pub use trade::{PrivateTrade, PublicTrade};
pub use volume::TradeVolume;

/// Direction of an order or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the wire-format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Kinds of push topic. At most one subscription per kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicKind {
    PublicTrades,
    RecentOrders,
    Candles,
    /// User-scoped executions, keyed by user id instead of pair.
    PrivateTrades,
}

impl TopicKind {
    /// The kinds that follow the selected pair.
    pub const PAIR_SCOPED: [TopicKind; 3] = [
        TopicKind::PublicTrades,
        TopicKind::RecentOrders,
        TopicKind::Candles,
    ];

    /// Returns a short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKind::PublicTrades => "public-trades",
            TopicKind::RecentOrders => "recent-orders",
            TopicKind::Candles => "candles",
            TopicKind::PrivateTrades => "private-trades",
        }
    }
}

/// A fully addressed push topic: kind plus pair (or user id) and, for
/// candles, the interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    kind: TopicKind,
    key: String,
    interval: Option<String>,
}

impl Topic {
    /// Public trades for a pair.
    pub fn public_trades(pair: &str) -> Self {
        Self {
            kind: TopicKind::PublicTrades,
            key: normalize_pair(pair),
            interval: None,
        }
    }

    /// Recent order updates for a pair.
    pub fn recent_orders(pair: &str) -> Self {
        Self {
            kind: TopicKind::RecentOrders,
            key: normalize_pair(pair),
            interval: None,
        }
    }

    /// Candle updates for a pair and interval.
    pub fn candles(pair: &str, interval: &str) -> Self {
        Self {
            kind: TopicKind::Candles,
            key: normalize_pair(pair),
            interval: Some(interval.to_string()),
        }
    }

    /// Private trade updates for a user.
    pub fn private_trades(user_id: &str) -> Self {
        Self {
            kind: TopicKind::PrivateTrades,
            key: user_id.to_string(),
            interval: None,
        }
    }

    pub fn kind(&self) -> TopicKind {
        self.kind
    }

    /// Returns the broker destination this topic is published on.
    pub fn destination(&self) -> String {
        match self.kind {
            TopicKind::PublicTrades => format!("/topic/public-trades/{}", self.key),
            TopicKind::RecentOrders => format!("/topic/recent-orders/{}", self.key),
            TopicKind::Candles => format!(
                "/topic/candles/{}/{}",
                self.key,
                self.interval.as_deref().unwrap_or_default()
            ),
            TopicKind::PrivateTrades => format!("/user/{}/queue/trades", self.key),
        }
    }
}

/// Normalizes a pair code for topic addressing (`usd/cup` → `USD-CUP`).
pub fn normalize_pair(pair: &str) -> String {
    pair.replace('/', "-").to_uppercase()
}
