//! Candlestick models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketSyncError, Result};

/// A single OHLCV bar.
///
/// Identity is `(pair, interval, timestamp)`; an update with the same
/// timestamp replaces the candle that is still forming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candlestick {
    pub pair: String,
    /// Start of the candle period, epoch milliseconds.
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    /// Latest price for a candle still in progress.
    pub close: Decimal,
    pub volume: Decimal,
    /// Candle duration, e.g. `"5m"`.
    pub interval: String,
}

impl Candlestick {
    /// # Errors
    ///
    /// Returns [`MarketSyncError::MalformedMessage`] for an empty pair or
    /// interval, a negative timestamp or volume, or `low > high`.
    pub fn validate(&self) -> Result<()> {
        if self.pair.is_empty() || self.interval.is_empty() {
            return Err(MarketSyncError::MalformedMessage(
                "candle without pair or interval".to_string(),
            ));
        }
        if self.timestamp < 0 || self.volume.is_sign_negative() || self.low > self.high {
            return Err(MarketSyncError::MalformedMessage(format!(
                "candle {} {} at {} is inconsistent",
                self.pair, self.interval, self.timestamp
            )));
        }
        Ok(())
    }
}
