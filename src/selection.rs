//! The globally selected trading pair.
//!
//! [`PairSelector`] is the single source of truth for which pair the feed
//! follows. It is cheap to clone and hands out `watch` receivers so any
//! number of consumers can react to changes.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::TradingPair;

/// Injectable holder for the selected pair.
#[derive(Debug, Clone)]
pub struct PairSelector {
    tx: Arc<watch::Sender<Option<TradingPair>>>,
}

impl PairSelector {
    /// Creates a selector holding `initial`.
    pub fn new(initial: Option<TradingPair>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Selects `pair`, notifying receivers only if its code differs from the
    /// current one. Returns `true` if a notification was sent.
    pub fn set_selected_pair(&self, pair: Option<TradingPair>) -> bool {
        let new_code = pair.as_ref().map(|p| p.value.clone());

        let changed = self.tx.send_if_modified(|current| {
            let unchanged = match (current.as_ref(), pair.as_ref()) {
                (Some(current), Some(new)) => current.same_code(new),
                (None, None) => true,
                _ => false,
            };
            if !unchanged {
                *current = pair;
            }
            !unchanged
        });

        if changed {
            info!(pair = new_code.as_deref(), "Selected pair changed");
        } else {
            debug!(pair = new_code.as_deref(), "Pair already selected, skipping");
        }
        changed
    }

    /// Returns the currently selected pair.
    pub fn current_pair(&self) -> Option<TradingPair> {
        self.tx.borrow().clone()
    }

    /// Returns just the code of the currently selected pair.
    pub fn current_code(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|p| p.value.clone())
    }

    /// Returns a receiver notified on every effective change.
    pub fn subscribe(&self) -> watch::Receiver<Option<TradingPair>> {
        self.tx.subscribe()
    }
}

impl Default for PairSelector {
    fn default() -> Self {
        Self::new(None)
    }
}
