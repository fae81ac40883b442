//! Public and private trade models.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::{MarketSyncError, Result};

/// An executed trade on the public tape.
///
/// Trades carry no identity; they are immutable append-only events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicTrade {
    pub pair: String,
    pub price: Decimal,
    pub volume: Decimal,
    /// Execution time as sent by the backend; also the display key.
    pub timestamp: String,
    pub side: Side,
}

impl PublicTrade {
    /// Checks the fields serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`MarketSyncError::MalformedMessage`] for an empty pair or
    /// timestamp, or a non-positive price or volume.
    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() || self.timestamp.is_empty() {
            return Err(MarketSyncError::MalformedMessage(
                "trade without pair or timestamp".to_string(),
            ));
        }
        if self.price <= Decimal::ZERO || self.volume <= Decimal::ZERO {
            return Err(MarketSyncError::MalformedMessage(format!(
                "trade on {} at {} has non-positive price or volume",
                self.pair, self.timestamp
            )));
        }
        Ok(())
    }
}

/// A trade executed on behalf of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateTrade {
    pub trade_id: u64,
    pub pair: String,
    pub executed_price: Decimal,
    pub executed_volume: Decimal,
    pub execution_time: String,
}

impl PrivateTrade {
    /// # Errors
    ///
    /// Returns [`MarketSyncError::MalformedMessage`] for an empty pair or a
    /// non-positive executed volume.
    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() || self.executed_volume <= Decimal::ZERO {
            return Err(MarketSyncError::MalformedMessage(format!(
                "private trade {} is missing pair or volume",
                self.trade_id
            )));
        }
        Ok(())
    }
}

/// Ordering key for trade timestamps.
///
/// The backend sends timestamps as strings. Epoch milliseconds compare
/// numerically; anything else (ISO-8601) compares lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeTime<'a> {
    Millis(i64),
    Text(&'a str),
}

impl<'a> TradeTime<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(ms) => TradeTime::Millis(ms),
            Err(_) => TradeTime::Text(raw),
        }
    }
}

impl Ord for TradeTime<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TradeTime::Millis(a), TradeTime::Millis(b)) => a.cmp(b),
            (TradeTime::Text(a), TradeTime::Text(b)) => a.cmp(b),
            (TradeTime::Millis(_), TradeTime::Text(_)) => Ordering::Less,
            (TradeTime::Text(_), TradeTime::Millis(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for TradeTime<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entries that can be ordered on a trade tape.
pub trait Timestamped {
    fn trade_time(&self) -> TradeTime<'_>;
}

impl Timestamped for PublicTrade {
    fn trade_time(&self) -> TradeTime<'_> {
        TradeTime::parse(&self.timestamp)
    }
}

impl Timestamped for PrivateTrade {
    fn trade_time(&self) -> TradeTime<'_> {
        TradeTime::parse(&self.execution_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_compare_numerically() {
        assert!(TradeTime::parse("999") < TradeTime::parse("1000"));
    }

    #[test]
    fn iso_timestamps_compare_lexicographically() {
        assert!(
            TradeTime::parse("2025-01-15T10:30:00Z") < TradeTime::parse("2025-01-15T10:31:00Z")
        );
    }
}
