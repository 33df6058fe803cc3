//! In-process publish/subscribe transport
//!
//! [`MemoryBus`] routes payloads between [`MemoryPeer`]s living in the same
//! process. Like a real mesh it delivers a publication to every subscriber of
//! the topic, the publisher's own subscriptions included. Failures of the
//! transport can be injected per topic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;

use crate::error::{ChatError, Result};
use crate::network::{PubSub, RawMessage, Subscription, Topic};
use crate::types::PeerId;

#[derive(Debug, Default)]
struct TopicState {
    members: Vec<PeerId>,
    subscribers: Vec<flume::Sender<RawMessage>>,
    fail_publishes: bool,
}

#[derive(Debug, Default)]
struct BusState {
    topics: HashMap<String, TopicState>,
    rejected_joins: HashSet<String>,
    rejected_subscribes: HashSet<String>,
}

/// Shared in-process message bus
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<BusState>>,
}

impl MemoryBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a peer with the given identity to the bus
    pub fn peer(&self, id: impl Into<PeerId>) -> MemoryPeer {
        MemoryPeer {
            id: id.into(),
            bus: self.clone(),
        }
    }

    /// Make every following join of `topic` fail
    pub fn reject_joins(&self, topic: &str) {
        self.lock().rejected_joins.insert(topic.to_string());
    }

    /// Make every following subscribe to `topic` fail
    pub fn reject_subscribes(&self, topic: &str) {
        self.lock().rejected_subscribes.insert(topic.to_string());
    }

    /// Toggle publish failures on `topic`
    pub fn fail_publishes(&self, topic: &str, fail: bool) {
        self.lock().topics.entry(topic.to_string()).or_default().fail_publishes = fail;
    }

    /// Terminate every current subscription of `topic`
    ///
    /// Messages already delivered stay readable; after them `next()` errors.
    pub fn close_subscriptions(&self, topic: &str) {
        if let Some(topic) = self.lock().topics.get_mut(topic) {
            topic.subscribers.clear();
        }
    }

    /// Deliver a raw payload to the subscribers of `topic` as if `origin` published it
    pub fn inject(&self, topic: &str, origin: impl Into<PeerId>, data: Vec<u8>) {
        let message = RawMessage {
            data,
            origin: origin.into(),
        };
        self.deliver(topic, message);
    }

    /// Number of live subscriptions on `topic`
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let mut state = self.lock();
        match state.topics.get_mut(topic) {
            Some(topic) => {
                topic.subscribers.retain(|tx| !tx.is_disconnected());
                topic.subscribers.len()
            }
            None => 0,
        }
    }

    fn deliver(&self, topic: &str, message: RawMessage) {
        let mut state = self.lock();
        if let Some(topic) = state.topics.get_mut(topic) {
            topic
                .subscribers
                .retain(|tx| tx.send(message.clone()).is_ok());
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        // State stays consistent even if a holder panicked mid-test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A peer attached to a [`MemoryBus`]
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    id: PeerId,
    bus: MemoryBus,
}

impl PubSub for MemoryPeer {
    type Topic = MemoryTopic;

    fn local_id(&self) -> PeerId {
        self.id.clone()
    }

    fn join<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<MemoryTopic>> {
        Box::pin(async move {
            let mut state = self.bus.lock();
            if state.rejected_joins.contains(topic) {
                return Err(ChatError::Transport(format!("join of '{}' rejected", topic)));
            }
            let entry = state.topics.entry(topic.to_string()).or_default();
            if !entry.members.contains(&self.id) {
                entry.members.push(self.id.clone());
            }
            Ok(MemoryTopic {
                name: topic.to_string(),
                peer_id: self.id.clone(),
                bus: self.bus.clone(),
            })
        })
    }

    fn list_peers<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<Vec<PeerId>>> {
        Box::pin(async move {
            let state = self.bus.lock();
            let peers = state
                .topics
                .get(topic)
                .map(|topic| {
                    topic
                        .members
                        .iter()
                        .filter(|member| **member != self.id)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            Ok(peers)
        })
    }
}

/// A topic joined through a [`MemoryPeer`]
///
/// Dropping it removes the peer from the topic's member list.
#[derive(Debug)]
pub struct MemoryTopic {
    name: String,
    peer_id: PeerId,
    bus: MemoryBus,
}

impl Topic for MemoryTopic {
    type Subscription = MemorySubscription;

    fn subscribe(&self) -> BoxFuture<'_, Result<MemorySubscription>> {
        Box::pin(async move {
            let mut state = self.bus.lock();
            if state.rejected_subscribes.contains(&self.name) {
                return Err(ChatError::Transport(format!(
                    "subscribe to '{}' rejected",
                    self.name
                )));
            }
            let (tx, rx) = flume::unbounded();
            state
                .topics
                .entry(self.name.clone())
                .or_default()
                .subscribers
                .push(tx);
            Ok(MemorySubscription {
                topic: self.name.clone(),
                rx,
            })
        })
    }

    fn publish(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let failing = self
                .bus
                .lock()
                .topics
                .get(&self.name)
                .is_some_and(|topic| topic.fail_publishes);
            if failing {
                return Err(ChatError::Transport(format!(
                    "publish on '{}' failed",
                    self.name
                )));
            }
            self.bus.deliver(
                &self.name,
                RawMessage {
                    data: payload,
                    origin: self.peer_id.clone(),
                },
            );
            Ok(())
        })
    }
}

impl Drop for MemoryTopic {
    fn drop(&mut self) {
        if let Some(topic) = self.bus.lock().topics.get_mut(&self.name) {
            topic.members.retain(|member| *member != self.peer_id);
        }
    }
}

/// Subscription handed out by a [`MemoryTopic`]
#[derive(Debug)]
pub struct MemorySubscription {
    topic: String,
    rx: flume::Receiver<RawMessage>,
}

impl Subscription for MemorySubscription {
    fn next(&mut self) -> BoxFuture<'_, Result<RawMessage>> {
        Box::pin(async move {
            self.rx
                .recv_async()
                .await
                .map_err(|_| ChatError::SubscriptionClosed(self.topic.clone()))
        })
    }
}
