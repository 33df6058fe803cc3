//! Topic channel of a joined room
//!
//! A [`ChatRoom`] owns the transport topic and a background receive task. The
//! task turns raw publications into [`ChatEnvelope`]s and pushes them into a
//! bounded queue read by the session loop:
//!
//! - publications from the local peer are dropped (loop-back suppression)
//! - payloads that do not decode are dropped, a foreign or broken peer must not stall the room
//! - when the queue is full the task waits, messages are never discarded for lack of room
//! - the first transport error closes the queue and ends the task

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::config::ChatConfig;
use crate::envelope::ChatEnvelope;
use crate::error::{ChatError, Result};
use crate::network::{PubSub, Subscription, Topic};
use crate::types::PeerId;

/// A room joined on a publish/subscribe transport
pub struct ChatRoom<P: PubSub> {
    pubsub: P,
    topic: P::Topic,
    room_name: String,
    room_id: String,
    self_id: PeerId,
    nickname: String,
    inbound_rx: flume::Receiver<ChatEnvelope>,
    cancel: CancellationToken,
    receive_task: JoinHandle<()>,
    /// Stops the receive task when the room is dropped
    _receive_guard: DropGuard,
}

impl<P: PubSub> std::fmt::Debug for ChatRoom<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRoom")
            .field("room_id", &self.room_id)
            .field("self_id", &self.self_id)
            .field("nickname", &self.nickname)
            .field("pending_messages", &self.inbound_rx.len())
            .finish()
    }
}

impl<P: PubSub> ChatRoom<P> {
    /// Join `room_name` and start receiving its messages
    ///
    /// The topic name is `config.room_prefix` followed by `room_name`. Joining
    /// and subscribing happen before anything else; if either fails the error
    /// is returned and nothing is left behind. `cancel` is the session context:
    /// cancelling it ends the receive task and aborts in-flight publishes.
    pub async fn join(
        cancel: CancellationToken,
        pubsub: P,
        nickname: impl Into<String>,
        room_name: impl Into<String>,
        config: &ChatConfig,
    ) -> Result<Self> {
        let room_name = room_name.into();
        let nickname = nickname.into();
        let room_id = config.room_id(&room_name);
        let self_id = pubsub.local_id();

        let topic = pubsub.join(&room_id).await?;
        let subscription = topic.subscribe().await?;

        let (inbound_tx, inbound_rx) = flume::bounded(config.inbound_capacity);
        let receive_token = cancel.child_token();
        let receive_task = tokio::spawn(receive_loop(
            subscription,
            inbound_tx,
            self_id.clone(),
            room_id.clone(),
            receive_token.clone(),
        ));

        tracing::info!(
            "Peer '{}' joined room '{}' as '{}'",
            self_id,
            room_id,
            nickname
        );

        Ok(Self {
            pubsub,
            topic,
            room_name,
            room_id,
            self_id,
            nickname,
            inbound_rx,
            cancel,
            receive_task,
            _receive_guard: receive_token.drop_guard(),
        })
    }

    /// Room name as typed by the user
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// Topic name of the room
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Identity of the local peer
    pub fn self_id(&self) -> &PeerId {
        &self.self_id
    }

    /// Nickname of the local user
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Session context the room was joined under
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Send `text` to the room
    ///
    /// Waits until the transport accepts the message. There is no timeout;
    /// only cancellation of the session context interrupts the call, which
    /// then fails with [`ChatError::Cancelled`].
    pub async fn publish(&self, text: impl Into<String>) -> Result<()> {
        let envelope = ChatEnvelope::new(text, self.self_id.as_str(), self.nickname.as_str());
        let payload = envelope.encode()?;

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ChatError::Cancelled),
            result = self.topic.publish(payload) => result,
        }
    }

    /// Peers the transport currently sees in the room
    pub async fn list_peers(&self) -> Result<Vec<PeerId>> {
        self.pubsub.list_peers(&self.room_id).await
    }

    /// Wait for the next message from another peer
    ///
    /// Returns `None` once the subscription has failed and every message
    /// received before the failure has been taken.
    pub async fn next_message(&self) -> Option<ChatEnvelope> {
        self.inbound_rx.recv_async().await.ok()
    }

    /// Number of received messages waiting to be taken
    pub fn pending_messages(&self) -> usize {
        self.inbound_rx.len()
    }

    /// Whether the receive task is still running
    pub fn is_receiving(&self) -> bool {
        !self.receive_task.is_finished()
    }
}

async fn receive_loop<S: Subscription>(
    mut subscription: S,
    inbound_tx: flume::Sender<ChatEnvelope>,
    self_id: PeerId,
    room_id: String,
    stop: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = stop.cancelled() => {
                tracing::debug!("Room '{}' receive task stopped", room_id);
                break;
            }
            result = subscription.next() => match result {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("Room '{}' subscription failed, closing inbound queue: {}", room_id, e);
                    break;
                }
            }
        };

        if message.origin == self_id {
            continue;
        }

        let envelope = match ChatEnvelope::decode(&message.data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(
                    "Room '{}' dropping undecodable message from '{}': {}",
                    room_id,
                    message.origin,
                    e
                );
                continue;
            }
        };

        // Waits while the session loop is behind
        tokio::select! {
            () = stop.cancelled() => break,
            result = inbound_tx.send_async(envelope) => {
                if result.is_err() {
                    tracing::debug!("Room '{}' inbound queue dropped by consumer", room_id);
                    break;
                }
            }
        }
    }
    // Dropping the only sender closes the queue
    drop(inbound_tx);
}
