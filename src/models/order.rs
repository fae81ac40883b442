//! Public order models for the recent-orders feed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::{MarketSyncError, Result};

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Active,
    PartlyFilled,
    Filled,
    Canceled,
}

/// An order as shown in the public order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrder {
    /// Identity; later messages with the same id replace this order.
    pub order_id: u64,
    pub pair: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Limit price; `None` for market orders.
    #[serde(default)]
    pub price: Option<Decimal>,
    pub volume_total: Decimal,
    pub volume_filled: Decimal,
    pub volume_remaining: Decimal,
    pub status: OrderStatus,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl PublicOrder {
    /// Checks the fields serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`MarketSyncError::MalformedMessage`] for an empty pair, a
    /// limit order without price, or negative volumes or timestamp.
    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() {
            return Err(MarketSyncError::MalformedMessage(format!(
                "order {} has no pair",
                self.order_id
            )));
        }
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(MarketSyncError::MalformedMessage(format!(
                "limit order {} has no price",
                self.order_id
            )));
        }
        let volumes = [self.volume_total, self.volume_filled, self.volume_remaining];
        if volumes.iter().any(Decimal::is_sign_negative) || self.timestamp < 0 {
            return Err(MarketSyncError::MalformedMessage(format!(
                "order {} has negative volume or timestamp",
                self.order_id
            )));
        }
        Ok(())
    }
}
