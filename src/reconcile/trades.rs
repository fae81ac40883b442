//! Bounded, newest-first trade tape.

use std::collections::VecDeque;

use crate::models::trade::Timestamped;

/// Newest-first list of trades capped at a fixed capacity.
///
/// Live pushes are always on top. A historical page loaded later is placed
/// beneath them, minus any entry already received live.
#[derive(Debug, Clone)]
pub struct TradeTape<T> {
    trades: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone + PartialEq + Timestamped> TradeTape<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends a batch as one block, newest first, evicting the oldest
    /// entries. Trades with equal timestamps keep their batch order.
    pub fn push_batch(&mut self, batch: impl IntoIterator<Item = T>) {
        let mut batch: Vec<T> = batch.into_iter().collect();
        batch.sort_by(|a, b| b.trade_time().cmp(&a.trade_time()));
        for trade in batch.into_iter().rev() {
            self.trades.push_front(trade);
        }
        self.trades.truncate(self.capacity);
    }

    /// Places a historical page beneath the live trades. Only entries equal
    /// to a trade already on the tape are dropped; repeats within the page
    /// are kept.
    pub fn load_history(&mut self, mut page: Vec<T>) {
        page.sort_by(|a, b| b.trade_time().cmp(&a.trade_time()));
        let live = self.trades.len();
        for trade in page {
            if self.trades.len() >= self.capacity {
                break;
            }
            if !self.trades.range(..live).any(|t| t == &trade) {
                self.trades.push_back(trade);
            }
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.trades.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.trades.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.trades.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.trades.clear();
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::{PublicTrade, Side};

    fn trade(ts: i64) -> PublicTrade {
        PublicTrade {
            pair: "USDCUP".to_string(),
            price: Decimal::from(320 + ts),
            volume: Decimal::ONE,
            timestamp: ts.to_string(),
            side: Side::Buy,
        }
    }

    fn stamps(tape: &TradeTape<PublicTrade>) -> Vec<String> {
        tape.iter().map(|t| t.timestamp.clone()).collect()
    }

    #[test]
    fn history_then_push() {
        let mut tape = TradeTape::new(100);
        tape.load_history(vec![trade(1), trade(3), trade(2)]);
        tape.push_batch([trade(4)]);
        assert_eq!(stamps(&tape), ["4", "3", "2", "1"]);
        assert_eq!(tape.latest().unwrap().timestamp, "4");
    }

    #[test]
    fn late_history_goes_beneath_live_trades() {
        let mut tape = TradeTape::new(100);
        tape.push_batch([trade(9)]);
        tape.load_history(vec![trade(7), trade(9), trade(8)]);
        assert_eq!(stamps(&tape), ["9", "8", "7"]);
    }

    #[test]
    fn oldest_first_batch_lands_newest_first() {
        let mut tape = TradeTape::new(100);
        tape.push_batch([trade(1), trade(2)]);
        assert_eq!(stamps(&tape), ["2", "1"]);
    }

    #[test]
    fn newest_first_batch_is_prepended_as_a_block() {
        let mut tape = TradeTape::new(100);
        tape.load_history(vec![trade(1)]);
        tape.push_batch([trade(3), trade(2)]);
        assert_eq!(stamps(&tape), ["3", "2", "1"]);
    }

    #[test]
    fn equal_timestamps_in_a_batch_keep_batch_order() {
        let mut a = trade(5);
        a.price = Decimal::from(1);
        let mut b = trade(5);
        b.price = Decimal::from(2);

        let mut tape = TradeTape::new(10);
        tape.push_batch([a.clone(), b.clone()]);
        assert_eq!(tape.to_vec(), vec![a, b]);
    }

    #[test]
    fn repeated_trades_within_a_page_are_kept() {
        let mut tape = TradeTape::new(100);
        tape.load_history(vec![trade(5), trade(5), trade(4)]);
        assert_eq!(stamps(&tape), ["5", "5", "4"]);
    }

    #[test]
    fn page_repeats_of_a_live_trade_are_all_dropped() {
        let mut tape = TradeTape::new(100);
        tape.push_batch([trade(5)]);
        tape.load_history(vec![trade(5), trade(5), trade(4)]);
        assert_eq!(stamps(&tape), ["5", "4"]);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut tape = TradeTape::new(100);
        tape.load_history((0..100).map(trade).collect());
        tape.push_batch((100..150).map(trade));
        assert_eq!(tape.len(), 100);
        assert_eq!(tape.latest().unwrap().timestamp, "149");
        assert_eq!(tape.iter().last().unwrap().timestamp, "50");
    }

    #[test]
    fn equal_timestamps_keep_page_order() {
        let mut a = trade(5);
        a.price = Decimal::from(1);
        let mut b = trade(5);
        b.price = Decimal::from(2);

        let mut tape = TradeTape::new(10);
        tape.load_history(vec![a.clone(), b.clone()]);
        assert_eq!(tape.to_vec(), vec![a, b]);
    }
}
