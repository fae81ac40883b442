//! Trading pair reference data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable currency pair as issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPair {
    /// Pair code, e.g. `"USDCUP"`. Selection compares on this field only.
    pub value: String,
    /// Display label, e.g. `"USD"`.
    pub view_value: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Lowest accepted order price.
    #[serde(default)]
    pub min: Option<Decimal>,
    /// Highest accepted order price.
    #[serde(default)]
    pub max: Option<Decimal>,
    /// Price tick size.
    #[serde(default)]
    pub step: Option<Decimal>,
    #[serde(default)]
    pub min_volume: Option<Decimal>,
}

impl TradingPair {
    /// Builds a bare pair from its code when no reference data is available.
    pub fn from_code(code: &str) -> Self {
        Self {
            value: code.to_string(),
            view_value: code.to_string(),
            image_url: None,
            min: None,
            max: None,
            step: None,
            min_volume: None,
        }
    }

    /// Returns `true` if both pairs carry the same code.
    pub fn same_code(&self, other: &TradingPair) -> bool {
        self.value == other.value
    }
}
