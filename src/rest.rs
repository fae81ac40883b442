//! Historical data loading over the backend's HTTP API.
//!
//! [`HistoricalLoader`] is the seam the feed depends on; [`RestClient`] is
//! the production implementation. Every call is a single request with no
//! retry; callers decide how to degrade on failure.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Result;
use crate::config::BackendConfig;
use crate::models::{Candlestick, Page, PublicOrder, PublicTrade, TradeVolume, TradingPair};

const RECENT_ORDERS_PATH: &str = "/api/v1/trade/public/recent-orders";
const TRADES_PATH: &str = "/api/v1/trade/market/trades";
const CANDLES_PATH: &str = "/api/v1/trade/market/candles";
const PAIRS_PATH: &str = "/api/v1/trade/currencies/pairs";

/// Source of historical snapshots for a pair.
pub trait HistoricalLoader: Send + Sync + 'static {
    /// Loads the most recent `limit` orders for `pair`, newest first.
    fn load_orders(
        &self,
        pair: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<PublicOrder>>> + Send;

    /// Loads one zero-indexed page of recent trades for `pair`.
    fn load_trades(
        &self,
        pair: &str,
        page: u32,
        size: u32,
    ) -> impl Future<Output = Result<Vec<PublicTrade>>> + Send;

    /// Loads up to `limit` candles for `pair` at `interval`.
    fn load_candles(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Candlestick>>> + Send;
}

/// HTTP client for the backend's market data endpoints.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestClient {
    /// Builds a client for `config`, optionally pinned to `tls_config`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketSyncError::Tls`](crate::MarketSyncError::Tls) if the
    /// underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig, tls_config: Option<rustls::ClientConfig>) -> Result<Self> {
        Self::with_timeout(
            &config.api_url,
            config.auth_token.clone(),
            config.request_timeout,
            tls_config,
        )
    }

    fn with_timeout(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
        tls_config: Option<rustls::ClientConfig>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(tls) = tls_config {
            builder = builder.use_preconfigured_tls(tls);
        }
        let http = builder.build().map_err(|e| {
            crate::MarketSyncError::Tls(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// Lists every pair the backend trades.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn load_pairs(&self) -> Result<Vec<TradingPair>> {
        self.get_json(PAIRS_PATH, &[]).await
    }

    /// Fetches aggregate trade volume for `pair`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not decode.
    pub async fn load_trade_volume(&self, pair: &str) -> Result<TradeVolume> {
        self.get_json(&format!("{TRADES_PATH}/{pair}/volume"), &[])
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "GET");

        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

impl HistoricalLoader for RestClient {
    async fn load_orders(&self, pair: &str, limit: u32) -> Result<Vec<PublicOrder>> {
        let page: Page<PublicOrder> = self
            .get_json(
                &format!("{RECENT_ORDERS_PATH}/{pair}/paged"),
                &[("page", "0".to_string()), ("size", limit.to_string())],
            )
            .await?;
        debug!(
            pair,
            returned = page.content.len(),
            total = page.total_elements,
            "Loaded recent orders"
        );
        Ok(page.content)
    }

    async fn load_trades(&self, pair: &str, page: u32, size: u32) -> Result<Vec<PublicTrade>> {
        let response: Page<PublicTrade> = self
            .get_json(
                &format!("{TRADES_PATH}/{pair}/paged"),
                &[("page", page.to_string()), ("size", size.to_string())],
            )
            .await?;
        debug!(
            pair,
            page = response.number,
            returned = response.content.len(),
            total = response.total_elements,
            last = response.last,
            "Loaded recent trades"
        );
        Ok(response.content)
    }

    async fn load_candles(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candlestick>> {
        let candles: Vec<Candlestick> = self
            .get_json(
                &format!("{CANDLES_PATH}/{pair}"),
                &[
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        debug!(pair, interval, returned = candles.len(), "Loaded candles");
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = RestClient::with_timeout(
            "http://localhost:8080/",
            None,
            Duration::from_secs(1),
            None,
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_http_error() {
        // Port 9 (discard) is not expected to run an HTTP server.
        let client =
            RestClient::with_timeout("http://127.0.0.1:9", None, Duration::from_secs(2), None)
                .unwrap();
        let err = client.load_trades("USDCUP", 0, 20).await.unwrap_err();
        assert!(matches!(err, crate::MarketSyncError::Http(_)));
    }
}
