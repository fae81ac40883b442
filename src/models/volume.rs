//! Trade volume statistics.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Aggregate traded volume for a pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeVolume {
    pub pair: String,
    /// Volume in the base currency.
    pub volume: Decimal,
    #[serde(default)]
    pub quote_volume: Option<Decimal>,
    #[serde(default)]
    pub trade_count: Option<u64>,
}
