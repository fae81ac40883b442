//! Recent orders keyed by order id.

use std::collections::VecDeque;

use tracing::debug;

use crate::models::{OrderType, PublicOrder, Side};

/// Outcome of [`RecentOrders::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// An order with the same id was replaced in place.
    Replaced,
    /// A new order was prepended.
    Inserted,
}

/// Bounded list of public orders; a later message for a known id replaces
/// the earlier one without moving it.
#[derive(Debug, Clone)]
pub struct RecentOrders {
    orders: VecDeque<PublicOrder>,
    capacity: usize,
    snapshot_loaded: bool,
}

impl RecentOrders {
    pub fn new(capacity: usize) -> Self {
        Self {
            orders: VecDeque::with_capacity(capacity),
            capacity,
            snapshot_loaded: false,
        }
    }

    /// Replaces the list with a historical snapshot, keeping the first
    /// occurrence of each id, then replays live updates that arrived first.
    ///
    /// Until the first snapshot the list holds only live updates, so it is
    /// its own replay buffer.
    pub fn load_snapshot(&mut self, snapshot: Vec<PublicOrder>) {
        let live: Vec<PublicOrder> = if self.snapshot_loaded {
            Vec::new()
        } else {
            self.orders.drain(..).collect()
        };

        self.orders.clear();
        for order in snapshot {
            if self.orders.len() >= self.capacity {
                break;
            }
            if !self.orders.iter().any(|o| o.order_id == order.order_id) {
                self.orders.push_back(order);
            }
        }

        self.snapshot_loaded = true;
        for order in live.into_iter().rev() {
            self.upsert(order);
        }
    }

    /// Applies one live order update.
    pub fn upsert(&mut self, order: PublicOrder) -> Upsert {
        if let Some(pos) = self.orders.iter().position(|o| o.order_id == order.order_id) {
            self.orders[pos] = order;
            return Upsert::Replaced;
        }

        if self.orders.len() >= self.capacity
            && let Some(evicted) = self.orders.pop_back()
        {
            debug!(order_id = evicted.order_id, "Evicted oldest order");
        }
        self.orders.push_front(order);
        Upsert::Inserted
    }

    pub fn orders(&self) -> impl Iterator<Item = &PublicOrder> {
        self.orders.iter()
    }

    /// The `n` newest non-market orders on `side`.
    pub fn top(&self, side: Side, n: usize) -> Vec<PublicOrder> {
        top_by_side(self.orders.iter(), side, n)
    }

    pub fn to_vec(&self) -> Vec<PublicOrder> {
        self.orders.iter().cloned().collect()
    }

    /// Empties the list and waits for a new snapshot.
    pub fn clear(&mut self) {
        self.orders.clear();
        self.snapshot_loaded = false;
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Filters `orders` to `side`, drops market orders, sorts newest first
/// (stable on equal timestamps) and takes `n`.
pub fn top_by_side<'a>(
    orders: impl Iterator<Item = &'a PublicOrder>,
    side: Side,
    n: usize,
) -> Vec<PublicOrder> {
    let mut selected: Vec<PublicOrder> = orders
        .filter(|o| o.side == side && o.order_type != OrderType::Market)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    selected.truncate(n);
    selected
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::OrderStatus;

    fn order(id: u64, side: Side, timestamp: i64) -> PublicOrder {
        PublicOrder {
            order_id: id,
            pair: "USDCUP".to_string(),
            side,
            order_type: OrderType::Limit,
            price: Some(dec!(320)),
            volume_total: dec!(10),
            volume_filled: dec!(0),
            volume_remaining: dec!(10),
            status: OrderStatus::Active,
            timestamp,
        }
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut book = RecentOrders::new(100);
        book.load_snapshot(vec![order(1, Side::Buy, 3), order(2, Side::Sell, 2)]);

        let mut filled = order(2, Side::Sell, 2);
        filled.status = OrderStatus::Filled;
        filled.volume_filled = dec!(10);
        filled.volume_remaining = dec!(0);

        assert_eq!(book.upsert(filled), Upsert::Replaced);
        assert_eq!(book.len(), 2);
        let ids: Vec<u64> = book.orders().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(book.to_vec()[1].status, OrderStatus::Filled);
    }

    #[test]
    fn new_orders_are_prepended_and_capped() {
        let mut book = RecentOrders::new(3);
        for id in 1..=4 {
            assert_eq!(book.upsert(order(id, Side::Buy, id as i64)), Upsert::Inserted);
        }
        let ids: Vec<u64> = book.orders().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn live_update_survives_a_late_snapshot() {
        let mut book = RecentOrders::new(100);
        let mut cancelled = order(2, Side::Sell, 2);
        cancelled.status = OrderStatus::Canceled;
        book.upsert(order(9, Side::Buy, 9));
        book.upsert(cancelled);

        book.load_snapshot(vec![order(2, Side::Sell, 2), order(1, Side::Buy, 1)]);
        let view: Vec<(u64, OrderStatus)> =
            book.orders().map(|o| (o.order_id, o.status)).collect();
        assert_eq!(
            view,
            vec![
                (9, OrderStatus::Active),
                (2, OrderStatus::Canceled),
                (1, OrderStatus::Active),
            ]
        );
    }

    #[test]
    fn updates_before_the_snapshot_stay_bounded() {
        let mut book = RecentOrders::new(3);
        for round in 0..10_000_i64 {
            let id = (round % 5) as u64;
            book.upsert(order(id, Side::Buy, round));
        }
        assert_eq!(book.len(), 3);

        book.load_snapshot(vec![order(7, Side::Sell, 1)]);
        let ids: Vec<u64> = book.orders().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
        assert_eq!(book.to_vec()[0].timestamp, 9_999);
    }

    #[test]
    fn snapshot_drops_duplicate_ids() {
        let mut book = RecentOrders::new(10);
        book.load_snapshot(vec![order(1, Side::Buy, 2), order(1, Side::Buy, 1)]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.to_vec()[0].timestamp, 2);
    }

    #[test]
    fn top_excludes_market_and_other_side() {
        let mut market = order(5, Side::Buy, 50);
        market.order_type = OrderType::Market;
        market.price = None;

        let orders = vec![
            order(1, Side::Buy, 10),
            order(2, Side::Sell, 40),
            market,
            order(3, Side::Buy, 30),
            order(4, Side::Buy, 30),
        ];
        let top: Vec<u64> = top_by_side(orders.iter(), Side::Buy, 2)
            .iter()
            .map(|o| o.order_id)
            .collect();
        assert_eq!(top, vec![3, 4]);
    }
}
