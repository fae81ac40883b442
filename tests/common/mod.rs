//! Shared test utilities and fixture builders.

#![allow(dead_code)]

use rust_decimal::Decimal;

use marketsync::models::{
    Candlestick, OrderStatus, OrderType, PrivateTrade, PublicOrder, PublicTrade, Side,
};

pub const USDCUP: &str = "USDCUP";
pub const CUPUSD: &str = "CUPUSD";

/// Backend used by live tests, overridable with `MARKETSYNC_API_URL`.
pub fn api_url() -> String {
    std::env::var("MARKETSYNC_API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Broker used by live tests, overridable with `MARKETSYNC_WEBSOCKET_URL`.
pub fn websocket_url() -> String {
    std::env::var("MARKETSYNC_WEBSOCKET_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/ws/stomp/websocket".to_string())
}

pub fn trade(pair: &str, timestamp_ms: i64) -> PublicTrade {
    PublicTrade {
        pair: pair.to_string(),
        price: Decimal::from(320),
        volume: Decimal::from(timestamp_ms.rem_euclid(97) + 1),
        timestamp: timestamp_ms.to_string(),
        side: Side::Buy,
    }
}

pub fn order(pair: &str, id: u64, side: Side, timestamp: i64) -> PublicOrder {
    PublicOrder {
        order_id: id,
        pair: pair.to_string(),
        side,
        order_type: OrderType::Limit,
        price: Some(Decimal::from(320)),
        volume_total: Decimal::from(10),
        volume_filled: Decimal::ZERO,
        volume_remaining: Decimal::from(10),
        status: OrderStatus::Active,
        timestamp,
    }
}

pub fn candle(pair: &str, interval: &str, timestamp: i64, close: i64) -> Candlestick {
    Candlestick {
        pair: pair.to_string(),
        timestamp,
        open: Decimal::from(close),
        high: Decimal::from(close + 1),
        low: Decimal::from(close - 1),
        close: Decimal::from(close),
        volume: Decimal::ONE,
        interval: interval.to_string(),
    }
}

pub fn private_trade(id: u64, pair: &str) -> PrivateTrade {
    PrivateTrade {
        trade_id: id,
        pair: pair.to_string(),
        executed_price: Decimal::from(320),
        executed_volume: Decimal::ONE,
        execution_time: id.to_string(),
    }
}

pub fn timestamps(trades: &[PublicTrade]) -> Vec<&str> {
    trades.iter().map(|t| t.timestamp.as_str()).collect()
}
