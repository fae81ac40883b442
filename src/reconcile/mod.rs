//! Merging of historical snapshots with live push updates.
//!
//! Each reconciler owns one ordered, deduplicated collection:
//! - [`orders::RecentOrders`] - upserted by order id, newest inserted first
//! - [`trades::TradeTape`] - newest first, bounded
//! - [`candles::CandleSeries`] - ascending by bucket start, one per timestamp
//!
//! Reconcilers never fail: out-of-contract input is dropped and the
//! existing view is left intact.

pub mod candles;
pub mod orders;
pub mod trades;

pub use candles::{CandleSeries, CandleUpdate};
pub use orders::{RecentOrders, Upsert, top_by_side};
pub use trades::TradeTape;

/// Most trades kept on a tape.
pub const MAX_TRADES: usize = 100;

/// Most orders kept in the recent orders list.
pub const MAX_ORDERS: usize = 100;

/// Orders shown per side of the book.
pub const BOOK_DEPTH: usize = 50;
