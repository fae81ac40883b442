//! The per-pair market view and its orchestration.
//!
//! [`MarketFeed`] owns the reconcilers for the selected pair. It is driven
//! by three inputs: pair changes, historical batches and push events. Each
//! selection bumps an epoch; historical batches tagged with an older epoch
//! or another pair are discarded so a slow response for a previous pair can
//! never leak into the current view.
//!
//! [`runner::FeedRunner`] wires a `MarketFeed` to the pair selector, the
//! connection manager and a [`HistoricalLoader`](crate::rest::HistoricalLoader).

pub mod runner;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::{
    Candlestick, OrderType, PrivateTrade, PublicOrder, PublicTrade, Side, Topic, TopicKind,
    normalize_pair,
};
use crate::reconcile::{
    CandleSeries, CandleUpdate, MAX_ORDERS, MAX_TRADES, RecentOrders, TradeTape, top_by_side,
};
use crate::websocket::{ConnectionCommand, ConnectionState, FeedEvent};

pub use runner::FeedRunner;

/// Historical data loaded for one pair.
#[derive(Debug, Clone, PartialEq)]
pub enum History {
    Orders(Vec<PublicOrder>),
    Trades(Vec<PublicTrade>),
    Candles {
        interval: String,
        candles: Vec<Candlestick>,
    },
}

/// A historical load result tagged with the selection it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBatch {
    pub epoch: u64,
    pub pair: String,
    pub history: History,
}

/// What a pair change requires of the outside world.
#[derive(Debug, Clone, PartialEq)]
pub struct PairChange {
    /// Epoch to tag historical loads for the new pair with.
    pub epoch: u64,
    pub pair: Option<String>,
    /// Unsubscribes for the old pair followed by subscribes for the new one.
    pub commands: Vec<ConnectionCommand>,
}

/// Read-only snapshot of the reconciled market state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketView {
    pub pair: Option<String>,
    pub interval: String,
    pub epoch: u64,
    /// Newest inserted first.
    pub orders: Vec<PublicOrder>,
    /// Newest first.
    pub trades: Vec<PublicTrade>,
    /// Ascending by timestamp.
    pub candles: Vec<Candlestick>,
    /// Newest first; survives pair changes.
    pub private_trades: Vec<PrivateTrade>,
    pub connection: ConnectionState,
}

impl MarketView {
    /// The `n` newest limit orders on `side`.
    pub fn top_orders(&self, side: Side, n: usize) -> Vec<PublicOrder> {
        top_by_side(self.orders.iter(), side, n)
    }

    /// Highest bid or lowest ask among the limit orders on `side`.
    pub fn best_price(&self, side: Side) -> Option<Decimal> {
        let prices = self
            .orders
            .iter()
            .filter(|o| o.side == side && o.order_type != OrderType::Market)
            .filter_map(|o| o.price);
        match side {
            Side::Buy => prices.max(),
            Side::Sell => prices.min(),
        }
    }

    pub fn latest_trade(&self) -> Option<&PublicTrade> {
        self.trades.first()
    }

    pub fn last_candle(&self) -> Option<&Candlestick> {
        self.candles.last()
    }
}

/// Reconciled orders, trades and candles for the selected pair.
#[derive(Debug)]
pub struct MarketFeed {
    pair: Option<String>,
    interval: String,
    epoch: u64,
    orders: RecentOrders,
    trades: TradeTape<PublicTrade>,
    candles: CandleSeries,
    private_trades: TradeTape<PrivateTrade>,
    connection: ConnectionState,
}

impl MarketFeed {
    /// Creates an empty feed with no pair selected.
    pub fn new(interval: &str) -> Self {
        Self {
            pair: None,
            interval: interval.to_string(),
            epoch: 0,
            orders: RecentOrders::new(MAX_ORDERS),
            trades: TradeTape::new(MAX_TRADES),
            candles: CandleSeries::new(None, interval),
            private_trades: TradeTape::new(MAX_TRADES),
            connection: ConnectionState::default(),
        }
    }

    pub fn pair(&self) -> Option<&str> {
        self.pair.as_deref()
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Switches to `pair`, clearing every pair-scoped view.
    pub fn select_pair(&mut self, pair: Option<&str>) -> PairChange {
        let pair = pair.map(normalize_pair);
        self.epoch += 1;

        info!(
            from = self.pair.as_deref(),
            to = pair.as_deref(),
            epoch = self.epoch,
            "Switching market feed"
        );

        self.pair = pair.clone();
        self.orders.clear();
        self.trades.clear();
        self.candles.reset(pair.as_deref(), &self.interval);

        let mut commands: Vec<ConnectionCommand> = TopicKind::PAIR_SCOPED
            .into_iter()
            .map(ConnectionCommand::Unsubscribe)
            .collect();
        if let Some(code) = &pair {
            commands.extend([
                ConnectionCommand::Subscribe(Topic::public_trades(code)),
                ConnectionCommand::Subscribe(Topic::recent_orders(code)),
                ConnectionCommand::Subscribe(Topic::candles(code, &self.interval)),
            ]);
        }

        PairChange {
            epoch: self.epoch,
            pair,
            commands,
        }
    }

    /// Applies a historical batch. Returns `true` if the view changed.
    pub fn apply_history(&mut self, batch: HistoryBatch) -> bool {
        if batch.epoch != self.epoch || !self.is_selected(&batch.pair) {
            debug!(
                pair = %batch.pair,
                epoch = batch.epoch,
                current_epoch = self.epoch,
                "Discarding stale history"
            );
            return false;
        }

        match batch.history {
            History::Orders(orders) => {
                debug!(count = orders.len(), "Applying order history");
                self.orders.load_snapshot(orders);
            }
            History::Trades(trades) => {
                debug!(count = trades.len(), "Applying trade history");
                self.trades.load_history(trades);
            }
            History::Candles { interval, candles } => {
                if interval != self.interval {
                    debug!(%interval, "Discarding candle history for another interval");
                    return false;
                }
                debug!(count = candles.len(), "Applying candle history");
                self.candles.load_history(candles);
            }
        }
        true
    }

    /// Applies a push event. Returns `true` if the view changed.
    pub fn apply_event(&mut self, event: FeedEvent) -> bool {
        match event {
            FeedEvent::Connection(state) => {
                let changed = self.connection != state;
                self.connection = state;
                changed
            }
            FeedEvent::Trades(trades) => {
                let accepted = self.for_selected_pair(trades, |t| &t.pair);
                if accepted.is_empty() {
                    return false;
                }
                self.trades.push_batch(accepted);
                true
            }
            FeedEvent::Orders(orders) => {
                let accepted = self.for_selected_pair(orders, |o| &o.pair);
                if accepted.is_empty() {
                    return false;
                }
                for order in accepted {
                    self.orders.upsert(order);
                }
                true
            }
            FeedEvent::Candle(candle) => matches!(
                self.candles.apply_update(candle),
                CandleUpdate::Appended | CandleUpdate::Replaced
            ),
            FeedEvent::PrivateTrades(trades) => {
                if trades.is_empty() {
                    return false;
                }
                self.private_trades.push_batch(trades);
                true
            }
        }
    }

    /// Returns an owned snapshot of the current state.
    pub fn view(&self) -> MarketView {
        MarketView {
            pair: self.pair.clone(),
            interval: self.interval.clone(),
            epoch: self.epoch,
            orders: self.orders.to_vec(),
            trades: self.trades.to_vec(),
            candles: self.candles.candles().to_vec(),
            private_trades: self.private_trades.to_vec(),
            connection: self.connection,
        }
    }

    fn is_selected(&self, pair: &str) -> bool {
        self.pair.as_deref() == Some(normalize_pair(pair).as_str())
    }

    fn for_selected_pair<T>(&self, items: Vec<T>, pair_of: impl Fn(&T) -> &String) -> Vec<T> {
        let total = items.len();
        let accepted: Vec<T> = items
            .into_iter()
            .filter(|item| self.is_selected(pair_of(item)))
            .collect();
        if accepted.len() < total {
            debug!(
                dropped = total - accepted.len(),
                selected = self.pair.as_deref(),
                "Dropping push entries for another pair"
            );
        }
        accepted
    }
}
