//! Push subscription bookkeeping.
//!
//! [`SubscriptionManager`] separates what the feed *wants* (desired topics,
//! one per [`TopicKind`]) from what the broker currently *has* (active
//! subscriptions with their STOMP ids). It performs no I/O: every operation
//! returns the frames the caller must send.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::frame::Frame;
use crate::models::{Topic, TopicKind};

/// Transport state as seen by the subscription layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveSubscription {
    id: String,
    topic: Topic,
}

/// Desired vs. active subscription state machine.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    state: ConnectionState,
    desired: BTreeMap<TopicKind, Topic>,
    active: BTreeMap<TopicKind, ActiveSubscription>,
    next_id: u64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The topic remembered for `kind`, subscribed or not.
    pub fn desired(&self, kind: TopicKind) -> Option<&Topic> {
        self.desired.get(&kind)
    }

    /// Returns `true` if `topic` is live on the broker.
    pub fn is_active(&self, topic: &Topic) -> bool {
        self.active
            .get(&topic.kind())
            .is_some_and(|active| &active.topic == topic)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Records `topic` as desired and, when connected, returns the frames
    /// that make it live: UNSUBSCRIBE for any other topic of the same kind
    /// followed by SUBSCRIBE. Returns nothing if it is already live or the
    /// connection is not up yet.
    pub fn subscribe(&mut self, topic: Topic) -> Vec<Frame> {
        let kind = topic.kind();
        self.desired.insert(kind, topic.clone());

        if self.state != ConnectionState::Connected {
            debug!(
                topic = kind.as_str(),
                destination = %topic.destination(),
                state = self.state.as_str(),
                "Subscription deferred until connected"
            );
            return Vec::new();
        }

        if self.is_active(&topic) {
            return Vec::new();
        }

        let mut frames = Vec::with_capacity(2);
        if let Some(previous) = self.active.remove(&kind) {
            info!(
                id = %previous.id,
                destination = %previous.topic.destination(),
                "Unsubscribing previous topic"
            );
            frames.push(Frame::unsubscribe(&previous.id));
        }
        frames.push(self.open(topic));
        frames
    }

    /// Forgets `kind` and returns an UNSUBSCRIBE if it was live. Safe to
    /// call when nothing is subscribed.
    pub fn unsubscribe(&mut self, kind: TopicKind) -> Vec<Frame> {
        self.desired.remove(&kind);
        match self.active.remove(&kind) {
            Some(previous) => {
                info!(
                    id = %previous.id,
                    destination = %previous.topic.destination(),
                    "Unsubscribed from topic"
                );
                vec![Frame::unsubscribe(&previous.id)]
            }
            None => Vec::new(),
        }
    }

    /// Forgets every topic.
    pub fn unsubscribe_all(&mut self) -> Vec<Frame> {
        let kinds: Vec<TopicKind> = self.desired.keys().copied().collect();
        kinds
            .into_iter()
            .flat_map(|kind| self.unsubscribe(kind))
            .collect()
    }

    /// The transport is (re)connecting; the broker has forgotten everything.
    pub fn on_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
        self.active.clear();
    }

    /// The broker accepted the session; returns SUBSCRIBE frames replaying
    /// every desired topic.
    pub fn on_connected(&mut self) -> Vec<Frame> {
        self.state = ConnectionState::Connected;
        self.active.clear();
        let topics: Vec<Topic> = self.desired.values().cloned().collect();
        topics.into_iter().map(|topic| self.open(topic)).collect()
    }

    /// The transport closed.
    pub fn on_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.active.clear();
    }

    /// Resolves a MESSAGE's `subscription` header to its live topic.
    pub fn topic_for(&self, subscription_id: &str) -> Option<&Topic> {
        self.active
            .values()
            .find(|active| active.id == subscription_id)
            .map(|active| &active.topic)
    }

    fn open(&mut self, topic: Topic) -> Frame {
        let id = format!("sub-{}", self.next_id);
        self.next_id += 1;

        let destination = topic.destination();
        info!(id = %id, %destination, "Subscribing to topic");
        let frame = Frame::subscribe(&id, &destination);
        self.active
            .insert(topic.kind(), ActiveSubscription { id, topic });
        frame
    }
}
