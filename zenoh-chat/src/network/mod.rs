//! Network layer for zenoh-chat
//!
//! The chat core talks to its transport only through the three capability
//! traits below. [`ZenohPubSub`] implements them over a Zenoh session,
//! [`MemoryBus`] over in-process channels.

pub mod keyexpr;
pub mod memory;
pub mod zenoh_pubsub;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::PeerId;

pub use keyexpr::RoomKeyexpr;
pub use memory::{MemoryBus, MemoryPeer};
pub use zenoh_pubsub::{ZenohPubSub, ZenohSubscription, ZenohTopic};

/// A raw payload delivered by a subscription, tagged with the peer that published it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Undecoded payload bytes
    pub data: Vec<u8>,
    /// Identity of the publishing peer
    pub origin: PeerId,
}

/// Entry point of a publish/subscribe transport
pub trait PubSub: Send + Sync + 'static {
    /// Handle to a joined topic
    type Topic: Topic;

    /// Identity of the local peer on this transport
    fn local_id(&self) -> PeerId;

    /// Join a topic by name
    fn join<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<Self::Topic>>;

    /// Peers currently known to share the topic, excluding the local peer
    fn list_peers<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<Vec<PeerId>>>;
}

/// A joined topic
pub trait Topic: Send + Sync + 'static {
    /// Stream of messages published on the topic
    type Subscription: Subscription;

    /// Start receiving messages published on the topic
    fn subscribe(&self) -> BoxFuture<'_, Result<Self::Subscription>>;

    /// Publish a payload to every subscriber of the topic
    fn publish(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>>;
}

/// An active subscription
pub trait Subscription: Send + 'static {
    /// Wait for the next message
    ///
    /// An error is terminal: the subscription delivers nothing afterwards.
    fn next(&mut self) -> BoxFuture<'_, Result<RawMessage>>;
}
