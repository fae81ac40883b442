use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use marketsync::MarketSyncError;
use marketsync::config::{fetch_config, is_pair_code};
use marketsync::feed::{FeedRunner, MarketView};
use marketsync::models::{Side, TradingPair};
use marketsync::reconcile::BOOK_DEPTH;
use marketsync::rest::RestClient;
use marketsync::selection::PairSelector;
use marketsync::tls::build_tls_config;
use marketsync::websocket::{ConnectionCommand, ConnectionManager};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), MarketSyncError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let config = fetch_config()?;

    let tls_config = config
        .backend
        .ca_cert
        .as_deref()
        .map(build_tls_config)
        .transpose()?;
    let rest = Arc::new(RestClient::new(&config.backend, tls_config.clone())?);

    let pairs = match rest.load_pairs().await {
        Ok(pairs) => {
            info!(count = pairs.len(), "Loaded trading pairs");
            pairs
        }
        Err(e) => {
            warn!("Failed to load trading pairs: {e}");
            Vec::new()
        }
    };
    let lookup = |code: &str| {
        pairs
            .iter()
            .find(|p| p.value == code)
            .cloned()
            .unwrap_or_else(|| TradingPair::from_code(code))
    };

    let selector = PairSelector::new(Some(lookup(&config.feed.pair)));

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let connection = ConnectionManager::new(
        &config.backend,
        &config.feed,
        tls_config.map(Arc::new),
        event_tx,
        cmd_rx,
    );
    let connection_task = tokio::spawn(connection.run());

    let (runner, mut view_rx) = FeedRunner::new(
        config.feed.clone(),
        Arc::clone(&rest),
        selector.subscribe(),
        event_rx,
        cmd_tx.clone(),
    );
    let runner_task = tokio::spawn(runner.run());

    info!("Type a pair code to switch, QUIT to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let code = line.trim().to_uppercase();
                    if code.is_empty() {
                        continue;
                    }
                    if code == "QUIT" {
                        break;
                    }
                    if !is_pair_code(&code) {
                        warn!(input = %code, "Not a pair code");
                        continue;
                    }
                    selector.set_selected_pair(Some(lookup(&code)));
                    tokio::spawn(log_trade_volume(Arc::clone(&rest), code));
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                log_view(&view_rx.borrow_and_update());
            }
            _ = &mut interrupted => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Shutting down");
    let _ = cmd_tx.send(ConnectionCommand::Shutdown);
    drop(selector);
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = tokio::join!(connection_task, runner_task);
    })
    .await
    .is_err()
    {
        warn!("Tasks did not stop in time");
    }

    Ok(())
}

async fn log_trade_volume(rest: Arc<RestClient>, code: String) {
    match rest.load_trade_volume(&code).await {
        Ok(volume) => info!(
            pair = %volume.pair,
            volume = %volume.volume,
            trades = volume.trade_count,
            "Trade volume"
        ),
        Err(e) => warn!(pair = %code, "Failed to load trade volume: {e}"),
    }
}

fn log_view(view: &MarketView) {
    let bids = view.top_orders(Side::Buy, BOOK_DEPTH);
    let asks = view.top_orders(Side::Sell, BOOK_DEPTH);
    let best_bid = view.best_price(Side::Buy).map(|p| p.to_string());
    let best_ask = view.best_price(Side::Sell).map(|p| p.to_string());
    let last_price = view.latest_trade().map(|t| t.price.to_string());

    info!(
        pair = view.pair.as_deref(),
        connection = view.connection.as_str(),
        orders = view.orders.len(),
        trades = view.trades.len(),
        candles = view.candles.len(),
        private_trades = view.private_trades.len(),
        bids = bids.len(),
        asks = asks.len(),
        best_bid = best_bid.as_deref(),
        best_ask = best_ask.as_deref(),
        last_price = last_price.as_deref(),
        "Market view updated"
    );
}
