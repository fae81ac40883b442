//! Ascending candlestick series for one pair and interval.

use tracing::debug;

use crate::models::{Candlestick, normalize_pair};

/// Outcome of [`CandleSeries::apply_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleUpdate {
    Appended,
    /// The forming candle was updated.
    Replaced,
    /// Older than the last candle.
    Ignored,
    /// Wrong pair or interval.
    Filtered,
}

/// Candles for the active `(pair, interval)`, strictly ascending by
/// timestamp.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    pair: Option<String>,
    interval: String,
    candles: Vec<Candlestick>,
    history_loaded: bool,
}

impl CandleSeries {
    pub fn new(pair: Option<&str>, interval: &str) -> Self {
        let mut series = Self::default();
        series.reset(pair, interval);
        series
    }

    /// Clears the series and scopes it to a new pair and interval.
    pub fn reset(&mut self, pair: Option<&str>, interval: &str) {
        self.pair = pair.map(normalize_pair);
        self.interval = interval.to_string();
        self.candles.clear();
        self.history_loaded = false;
    }

    /// Returns `true` if `candle` belongs to the active scope.
    pub fn accepts(&self, candle: &Candlestick) -> bool {
        candle.interval == self.interval
            && self.pair.as_deref() == Some(normalize_pair(&candle.pair).as_str())
    }

    pub fn apply_update(&mut self, candle: Candlestick) -> CandleUpdate {
        if !self.accepts(&candle) {
            debug!(
                pair = %candle.pair,
                interval = %candle.interval,
                "Dropping candle outside the active series"
            );
            return CandleUpdate::Filtered;
        }
        self.merge(candle)
    }

    /// Replaces the series with `history`, then replays live candles
    /// already received. Before the first load the series holds only live
    /// candles, one per timestamp.
    pub fn load_history(&mut self, history: Vec<Candlestick>) {
        let live = if self.history_loaded {
            Vec::new()
        } else {
            std::mem::take(&mut self.candles)
        };

        let mut loaded: Vec<Candlestick> =
            history.into_iter().filter(|c| self.accepts(c)).collect();
        loaded.sort_by_key(|c| c.timestamp);

        self.candles.clear();
        for candle in loaded {
            if self.candles.last().map(|last| last.timestamp) == Some(candle.timestamp) {
                self.candles.pop();
            }
            self.candles.push(candle);
        }

        self.history_loaded = true;
        for candle in live {
            self.merge(candle);
        }
    }

    fn merge(&mut self, candle: Candlestick) -> CandleUpdate {
        match self.candles.last().map(|last| last.timestamp) {
            Some(last) if candle.timestamp < last => CandleUpdate::Ignored,
            Some(last) if candle.timestamp == last => {
                let end = self.candles.len() - 1;
                self.candles[end] = candle;
                CandleUpdate::Replaced
            }
            _ => {
                self.candles.push(candle);
                CandleUpdate::Appended
            }
        }
    }

    pub fn candles(&self) -> &[Candlestick] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candlestick> {
        self.candles.last()
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}
