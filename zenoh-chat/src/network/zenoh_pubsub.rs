//! Publish/subscribe transport over a Zenoh session

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::BoxFuture;
use zenoh::liveliness::LivelinessToken;
use zenoh::sample::SampleKind;

use crate::error::{ChatError, Result};
use crate::network::keyexpr::RoomKeyexpr;
use crate::network::{PubSub, RawMessage, Subscription, Topic};
use crate::types::PeerId;

/// Peers seen alive in one room, self included
type MemberSet = Arc<Mutex<BTreeSet<PeerId>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Chat transport backed by a Zenoh session
///
/// Peers of the same room find each other through Zenoh scouting; nothing
/// beyond the `zenoh::Config` of the session is needed.
#[derive(Debug, Clone)]
pub struct ZenohPubSub {
    session: zenoh::Session,
    peer_id: PeerId,
    /// Membership of every joined room by room id, alive while its topic is held
    rooms: Arc<Mutex<HashMap<String, Weak<Mutex<BTreeSet<PeerId>>>>>>,
}

impl ZenohPubSub {
    /// Create a transport identified by the session's Zenoh id
    pub fn new(session: zenoh::Session) -> Self {
        let peer_id = PeerId::new(session.zid().to_string());
        Self {
            session,
            peer_id,
            rooms: Arc::default(),
        }
    }

    /// Override the local peer id
    ///
    /// Needed when several chat peers share one Zenoh session.
    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = peer_id;
        self
    }
}

impl PubSub for ZenohPubSub {
    type Topic = ZenohTopic;

    fn local_id(&self) -> PeerId {
        self.peer_id.clone()
    }

    fn join<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<ZenohTopic>> {
        Box::pin(async move {
            let keys = RoomKeyexpr::new(topic)?;

            let publisher = self
                .session
                .declare_publisher(keys.message(&self.peer_id)?)
                .await?;

            // Membership is tracked locally from liveliness changes, starting
            // with the tokens already alive
            let members = MemberSet::default();
            let watched_keys = keys.clone();
            let watched_members = members.clone();
            let membership = self
                .session
                .liveliness()
                .declare_subscriber(keys.peer_lookup()?)
                .history(true)
                .callback(move |sample| {
                    let Some(peer) = watched_keys.peer_member(sample.key_expr().as_str()) else {
                        tracing::debug!("Ignoring membership key '{}'", sample.key_expr());
                        return;
                    };
                    let mut members = lock(&watched_members);
                    match sample.kind() {
                        SampleKind::Put => {
                            members.insert(peer);
                        }
                        SampleKind::Delete => {
                            members.remove(&peer);
                        }
                    }
                })
                .await?;

            // Membership is announced for as long as the topic is held
            let token = self
                .session
                .liveliness()
                .declare_token(keys.peer(&self.peer_id)?)
                .await?;

            {
                let mut rooms = lock(&self.rooms);
                rooms.retain(|_, room| room.strong_count() > 0);
                rooms.insert(keys.room_id().to_string(), Arc::downgrade(&members));
            }

            tracing::debug!("Peer '{}' joined topic '{}'", self.peer_id, topic);

            Ok(ZenohTopic {
                session: self.session.clone(),
                keys,
                publisher,
                members,
                _membership: membership,
                _token: token,
            })
        })
    }

    fn list_peers<'a>(&'a self, topic: &'a str) -> BoxFuture<'a, Result<Vec<PeerId>>> {
        Box::pin(async move {
            let keys = RoomKeyexpr::new(topic)?;
            let Some(members) = lock(&self.rooms)
                .get(keys.room_id())
                .and_then(Weak::upgrade)
            else {
                return Ok(Vec::new());
            };
            let peers = lock(&members)
                .iter()
                .filter(|peer| **peer != self.peer_id)
                .cloned()
                .collect();
            Ok(peers)
        })
    }
}

/// A room topic joined on Zenoh
///
/// Holds the message publisher, the membership watcher and the liveliness
/// token; dropping it leaves the room.
pub struct ZenohTopic {
    session: zenoh::Session,
    keys: RoomKeyexpr,
    publisher: zenoh::pubsub::Publisher<'static>,
    members: MemberSet,
    _membership: zenoh::pubsub::Subscriber<()>,
    _token: LivelinessToken,
}

impl std::fmt::Debug for ZenohTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenohTopic")
            .field("room_id", &self.keys.room_id())
            .field("key_expr", &self.publisher.key_expr())
            .field("members", &lock(&self.members).len())
            .finish()
    }
}

impl Topic for ZenohTopic {
    type Subscription = ZenohSubscription;

    fn subscribe(&self) -> BoxFuture<'_, Result<ZenohSubscription>> {
        Box::pin(async move {
            let subscriber = self
                .session
                .declare_subscriber(self.keys.message_lookup()?)
                .await?;
            Ok(ZenohSubscription {
                keys: self.keys.clone(),
                subscriber,
            })
        })
    }

    fn publish(&self, payload: Vec<u8>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.publisher.put(payload).await?;
            Ok(())
        })
    }
}

/// Subscription to every message published in a room
pub struct ZenohSubscription {
    keys: RoomKeyexpr,
    subscriber:
        zenoh::pubsub::Subscriber<zenoh::handlers::FifoChannelHandler<zenoh::sample::Sample>>,
}

impl std::fmt::Debug for ZenohSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenohSubscription")
            .field("key_expr", &self.subscriber.key_expr())
            .finish()
    }
}

impl Subscription for ZenohSubscription {
    fn next(&mut self) -> BoxFuture<'_, Result<RawMessage>> {
        Box::pin(async move {
            loop {
                let sample = self.subscriber.recv_async().await.map_err(|e| {
                    ChatError::SubscriptionClosed(format!("{}: {}", self.keys.room_id(), e))
                })?;

                // The subscription pattern only matches message keys, anything else is noise
                let Some(origin) = self.keys.message_origin(sample.key_expr().as_str()) else {
                    tracing::debug!("Ignoring sample on unexpected key '{}'", sample.key_expr());
                    continue;
                };

                return Ok(RawMessage {
                    data: sample.payload().to_bytes().into_owned(),
                    origin,
                });
            }
        })
    }
}
