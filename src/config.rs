//! Application configuration loaded from environment variables.
//!
//! Every variable is optional; empty values are treated as absent:
//! - `MARKETSYNC_API_URL` - base URL of the trading backend's HTTP API
//! - `MARKETSYNC_WEBSOCKET_URL` - STOMP-over-WebSocket endpoint
//! - `MARKETSYNC_AUTH_TOKEN` - bearer token forwarded to HTTP and STOMP
//! - `MARKETSYNC_CA_CERT` - PEM bundle pinning the backend's CA
//! - `MARKETSYNC_PAIR` / `MARKETSYNC_INTERVAL` - initial selection
//! - `MARKETSYNC_USER_ID` - enables the private trades feed (needs a token)
//!
//! Feed sizing and timing can be tuned with `MARKETSYNC_ORDER_LIMIT`,
//! `MARKETSYNC_TRADE_PAGE_SIZE`, `MARKETSYNC_CANDLE_LIMIT`,
//! `MARKETSYNC_REQUEST_TIMEOUT_SECS`, `MARKETSYNC_RECONNECT_DELAY_SECS` and
//! `MARKETSYNC_HEARTBEAT_MS`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::MarketSyncError;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:8080/ws/stomp/websocket";
const DEFAULT_PAIR: &str = "USDCUP";
const DEFAULT_INTERVAL: &str = "5m";
const DEFAULT_ORDER_LIMIT: u32 = 100;
const DEFAULT_TRADE_PAGE_SIZE: u32 = 20;
const DEFAULT_CANDLE_LIMIT: u32 = 200;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
const DEFAULT_HEARTBEAT_MS: u64 = 4000;

/// Largest trade page the backend serves.
const MAX_TRADE_PAGE_SIZE: u32 = 100;

/// Candle intervals the backend aggregates.
pub const SUPPORTED_INTERVALS: &[&str] = &["1m", "5m", "15m", "30m", "1h", "4h", "1d"];

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub feed: FeedConfig,
}

/// Where and how to reach the trading backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_url: String,
    pub websocket_url: String,
    pub auth_token: Option<String>,
    pub ca_cert: Option<PathBuf>,
    pub request_timeout: Duration,
}

/// What the feed tracks and how aggressively.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Initial pair code, e.g. `USDCUP`.
    pub pair: String,
    /// Candle interval, e.g. `5m`.
    pub interval: String,
    pub user_id: Option<String>,
    pub order_limit: u32,
    pub trade_page_size: u32,
    pub candle_limit: u32,
    pub reconnect_delay: Duration,
    pub heartbeat: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            pair: DEFAULT_PAIR.to_string(),
            interval: DEFAULT_INTERVAL.to_string(),
            user_id: None,
            order_limit: DEFAULT_ORDER_LIMIT,
            trade_page_size: DEFAULT_TRADE_PAGE_SIZE,
            candle_limit: DEFAULT_CANDLE_LIMIT,
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            heartbeat: Duration::from_millis(DEFAULT_HEARTBEAT_MS),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            auth_token: None,
            ca_cert: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Loads the application configuration from environment variables.
///
/// # Errors
///
/// Returns [`MarketSyncError::Config`] if a value cannot be parsed, the pair
/// code or interval is invalid, or `MARKETSYNC_USER_ID` is set without
/// `MARKETSYNC_AUTH_TOKEN`.
pub fn fetch_config() -> crate::Result<AppConfig> {
    config_from(|name| std::env::var(name).ok())
}

/// Builds the configuration from an arbitrary variable lookup.
fn config_from<F>(lookup: F) -> crate::Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|s| !s.is_empty());

    let auth_token = var("MARKETSYNC_AUTH_TOKEN");
    let user_id = var("MARKETSYNC_USER_ID");
    if user_id.is_some() && auth_token.is_none() {
        return Err(MarketSyncError::Config(
            "MARKETSYNC_USER_ID is set but MARKETSYNC_AUTH_TOKEN is missing".to_string(),
        ));
    }

    let pair = var("MARKETSYNC_PAIR")
        .map(|p| p.to_uppercase())
        .unwrap_or_else(|| DEFAULT_PAIR.to_string());
    if !is_pair_code(&pair) {
        return Err(MarketSyncError::Config(format!(
            "MARKETSYNC_PAIR must be a 6 character code, got {pair:?}"
        )));
    }

    let interval = var("MARKETSYNC_INTERVAL").unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
    if !SUPPORTED_INTERVALS.contains(&interval.as_str()) {
        return Err(MarketSyncError::Config(format!(
            "MARKETSYNC_INTERVAL {interval:?} is not one of {}",
            SUPPORTED_INTERVALS.join(", ")
        )));
    }

    let trade_page_size = parse_var(
        var("MARKETSYNC_TRADE_PAGE_SIZE"),
        "MARKETSYNC_TRADE_PAGE_SIZE",
        DEFAULT_TRADE_PAGE_SIZE,
    )?;
    if !(1..=MAX_TRADE_PAGE_SIZE).contains(&trade_page_size) {
        return Err(MarketSyncError::Config(format!(
            "MARKETSYNC_TRADE_PAGE_SIZE must be between 1 and {MAX_TRADE_PAGE_SIZE}"
        )));
    }

    let order_limit = non_zero(
        "MARKETSYNC_ORDER_LIMIT",
        parse_var(
            var("MARKETSYNC_ORDER_LIMIT"),
            "MARKETSYNC_ORDER_LIMIT",
            DEFAULT_ORDER_LIMIT,
        )?,
    )?;
    let candle_limit = non_zero(
        "MARKETSYNC_CANDLE_LIMIT",
        parse_var(
            var("MARKETSYNC_CANDLE_LIMIT"),
            "MARKETSYNC_CANDLE_LIMIT",
            DEFAULT_CANDLE_LIMIT,
        )?,
    )?;

    let feed = FeedConfig {
        pair,
        interval,
        user_id,
        order_limit,
        trade_page_size,
        candle_limit,
        reconnect_delay: Duration::from_secs(parse_var(
            var("MARKETSYNC_RECONNECT_DELAY_SECS"),
            "MARKETSYNC_RECONNECT_DELAY_SECS",
            DEFAULT_RECONNECT_DELAY_SECS,
        )?),
        heartbeat: Duration::from_millis(parse_var(
            var("MARKETSYNC_HEARTBEAT_MS"),
            "MARKETSYNC_HEARTBEAT_MS",
            DEFAULT_HEARTBEAT_MS,
        )?),
    };

    let backend = BackendConfig {
        api_url: var("MARKETSYNC_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        websocket_url: var("MARKETSYNC_WEBSOCKET_URL")
            .unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.to_string()),
        auth_token,
        ca_cert: var("MARKETSYNC_CA_CERT").map(PathBuf::from),
        request_timeout: Duration::from_secs(parse_var(
            var("MARKETSYNC_REQUEST_TIMEOUT_SECS"),
            "MARKETSYNC_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?),
    };

    Ok(AppConfig { backend, feed })
}

/// Returns `true` for six ASCII alphanumeric characters, e.g. `USDCUP`.
pub fn is_pair_code(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_alphanumeric())
}

fn parse_var<T: FromStr>(value: Option<String>, name: &str, default: T) -> crate::Result<T> {
    match value {
        Some(raw) => raw.trim().parse().map_err(|_| {
            MarketSyncError::Config(format!("{name} has an invalid value: {raw:?}"))
        }),
        None => Ok(default),
    }
}

fn non_zero(name: &str, value: u32) -> crate::Result<u32> {
    if value == 0 {
        return Err(MarketSyncError::Config(format!("{name} must be at least 1")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> crate::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config_from(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_env_vars() {
        let config = load(&[]).unwrap();
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend.websocket_url, DEFAULT_WEBSOCKET_URL);
        assert!(config.backend.auth_token.is_none());
        assert!(config.backend.ca_cert.is_none());
        assert_eq!(config.feed.pair, "USDCUP");
        assert_eq!(config.feed.interval, "5m");
        assert_eq!(config.feed.trade_page_size, 20);
        assert_eq!(config.feed.candle_limit, 200);
        assert_eq!(config.feed.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.feed.heartbeat, Duration::from_millis(4000));
    }

    #[test]
    fn custom_urls_and_token() {
        let config = load(&[
            ("MARKETSYNC_API_URL", "https://api.example.com/"),
            ("MARKETSYNC_WEBSOCKET_URL", "wss://api.example.com/ws/stomp/websocket"),
            ("MARKETSYNC_AUTH_TOKEN", "jwt"),
        ])
        .unwrap();
        assert_eq!(config.backend.api_url, "https://api.example.com");
        assert_eq!(
            config.backend.websocket_url,
            "wss://api.example.com/ws/stomp/websocket"
        );
        assert_eq!(config.backend.auth_token.as_deref(), Some("jwt"));
    }

    #[test]
    fn pair_is_uppercased() {
        let config = load(&[("MARKETSYNC_PAIR", "cupusd")]).unwrap();
        assert_eq!(config.feed.pair, "CUPUSD");
    }

    #[test]
    fn rejects_bad_pair_code() {
        let err = load(&[("MARKETSYNC_PAIR", "USD/CUP")]).unwrap_err();
        assert!(err.to_string().contains("MARKETSYNC_PAIR"));
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = load(&[("MARKETSYNC_INTERVAL", "7m")]).unwrap_err();
        assert!(err.to_string().contains("MARKETSYNC_INTERVAL"));
    }

    #[test]
    fn rejects_user_without_token() {
        let err = load(&[("MARKETSYNC_USER_ID", "42")]).unwrap_err();
        assert!(err.to_string().contains("MARKETSYNC_AUTH_TOKEN is missing"));
    }

    #[test]
    fn rejects_out_of_range_trade_page() {
        assert!(load(&[("MARKETSYNC_TRADE_PAGE_SIZE", "0")]).is_err());
        assert!(load(&[("MARKETSYNC_TRADE_PAGE_SIZE", "101")]).is_err());
        let config = load(&[("MARKETSYNC_TRADE_PAGE_SIZE", "100")]).unwrap();
        assert_eq!(config.feed.trade_page_size, 100);
    }

    #[test]
    fn rejects_zero_order_and_candle_limits() {
        let err = load(&[("MARKETSYNC_ORDER_LIMIT", "0")]).unwrap_err();
        assert!(err.to_string().contains("MARKETSYNC_ORDER_LIMIT"));
        let err = load(&[("MARKETSYNC_CANDLE_LIMIT", "0")]).unwrap_err();
        assert!(err.to_string().contains("MARKETSYNC_CANDLE_LIMIT"));

        let config = load(&[
            ("MARKETSYNC_ORDER_LIMIT", "1"),
            ("MARKETSYNC_CANDLE_LIMIT", "1"),
        ])
        .unwrap();
        assert_eq!(config.feed.order_limit, 1);
        assert_eq!(config.feed.candle_limit, 1);
    }

    #[test]
    fn rejects_non_numeric_values() {
        let err = load(&[("MARKETSYNC_HEARTBEAT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("MARKETSYNC_HEARTBEAT_MS"));
    }

    #[test]
    fn empty_values_treated_as_absent() {
        let config = load(&[
            ("MARKETSYNC_API_URL", ""),
            ("MARKETSYNC_AUTH_TOKEN", ""),
            ("MARKETSYNC_USER_ID", ""),
            ("MARKETSYNC_PAIR", ""),
        ])
        .unwrap();
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
        assert!(config.backend.auth_token.is_none());
        assert!(config.feed.user_id.is_none());
        assert_eq!(config.feed.pair, DEFAULT_PAIR);
    }
}
