//! Async driver for [`MarketFeed`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use super::{History, HistoryBatch, MarketFeed, MarketView};
use crate::Result;
use crate::config::FeedConfig;
use crate::models::{Topic, TradingPair};
use crate::rest::HistoricalLoader;
use crate::websocket::{ConnectionCommand, FeedEvent};

/// One wake-up of the runner loop.
enum Step {
    Selection(bool),
    Event(Option<FeedEvent>),
    History(Option<HistoryBatch>),
}

/// Owns a [`MarketFeed`] and feeds it from the selector, the connection
/// manager and background history loads. Every change is published on a
/// `watch` channel.
pub struct FeedRunner<L> {
    config: FeedConfig,
    loader: Arc<L>,
    feed: MarketFeed,
    selection: watch::Receiver<Option<TradingPair>>,
    events: mpsc::UnboundedReceiver<FeedEvent>,
    commands: mpsc::UnboundedSender<ConnectionCommand>,
    view_tx: watch::Sender<MarketView>,
    history_tx: mpsc::UnboundedSender<HistoryBatch>,
    history_rx: mpsc::UnboundedReceiver<HistoryBatch>,
}

impl<L: HistoricalLoader> FeedRunner<L> {
    /// Creates a runner and the receiver its views are published on.
    pub fn new(
        config: FeedConfig,
        loader: Arc<L>,
        selection: watch::Receiver<Option<TradingPair>>,
        events: mpsc::UnboundedReceiver<FeedEvent>,
        commands: mpsc::UnboundedSender<ConnectionCommand>,
    ) -> (Self, watch::Receiver<MarketView>) {
        let feed = MarketFeed::new(&config.interval);
        let (view_tx, view_rx) = watch::channel(feed.view());
        let (history_tx, history_rx) = mpsc::unbounded_channel();

        let runner = Self {
            config,
            loader,
            feed,
            selection,
            events,
            commands,
            view_tx,
            history_tx,
            history_rx,
        };
        (runner, view_rx)
    }

    /// Runs until the selector or the connection manager goes away.
    pub async fn run(mut self) {
        if let Some(user_id) = self.config.user_id.clone() {
            info!(user_id = %user_id, "Subscribing to private trades");
            self.send_command(ConnectionCommand::Subscribe(Topic::private_trades(&user_id)));
        }

        let initial = self.selection.borrow_and_update().clone();
        self.switch_pair(initial);

        loop {
            let step = tokio::select! {
                changed = self.selection.changed() => Step::Selection(changed.is_ok()),
                event = self.events.recv() => Step::Event(event),
                batch = self.history_rx.recv() => Step::History(batch),
            };

            match step {
                Step::Selection(true) => {
                    let pair = self.selection.borrow_and_update().clone();
                    self.switch_pair(pair);
                }
                Step::Selection(false) => {
                    info!("Pair selector dropped, stopping feed");
                    return;
                }
                Step::Event(Some(event)) => {
                    if self.feed.apply_event(event) {
                        self.publish();
                    }
                }
                Step::Event(None) => {
                    info!("Push event stream closed, stopping feed");
                    return;
                }
                Step::History(Some(batch)) => {
                    if self.feed.apply_history(batch) {
                        self.publish();
                    }
                }
                // The runner holds a sender, so this never happens.
                Step::History(None) => return,
            }
        }
    }

    fn switch_pair(&mut self, pair: Option<TradingPair>) {
        let code = pair.map(|p| p.value);
        let change = self.feed.select_pair(code.as_deref());
        for command in change.commands {
            self.send_command(command);
        }
        self.publish();

        if let Some(pair) = change.pair {
            self.spawn_loads(change.epoch, pair);
        }
    }

    /// Loads orders, trades and candles for `pair` concurrently in the
    /// background, delivering each as soon as it completes. A failed load is
    /// logged and delivered as an empty batch.
    fn spawn_loads(&self, epoch: u64, pair: String) {
        let loader = Arc::clone(&self.loader);
        let tx = self.history_tx.clone();
        let interval = self.config.interval.clone();
        let order_limit = self.config.order_limit;
        let trade_page_size = self.config.trade_page_size;
        let candle_limit = self.config.candle_limit;

        tokio::spawn(async move {
            let deliver = |what: &str, result: Result<History>, fallback: History| {
                let history = result.unwrap_or_else(|e| {
                    warn!(pair = %pair, what, "Failed to load history, using an empty one: {e}");
                    fallback
                });
                let _ = tx.send(HistoryBatch {
                    epoch,
                    pair: pair.clone(),
                    history,
                });
            };

            tokio::join!(
                async {
                    let result = loader.load_orders(&pair, order_limit).await;
                    deliver(
                        "orders",
                        result.map(History::Orders),
                        History::Orders(Vec::new()),
                    );
                },
                async {
                    let result = loader.load_trades(&pair, 0, trade_page_size).await;
                    deliver(
                        "trades",
                        result.map(History::Trades),
                        History::Trades(Vec::new()),
                    );
                },
                async {
                    let result = loader.load_candles(&pair, &interval, candle_limit).await;
                    let empty = History::Candles {
                        interval: interval.clone(),
                        candles: Vec::new(),
                    };
                    deliver(
                        "candles",
                        result.map(|candles| History::Candles {
                            interval: interval.clone(),
                            candles,
                        }),
                        empty,
                    );
                },
            );
        });
    }

    fn send_command(&self, command: ConnectionCommand) {
        if self.commands.send(command).is_err() {
            warn!("Connection manager is gone, command dropped");
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.feed.view());
    }
}
