use tokio_util::sync::CancellationToken;
use zenoh::Resolvable;

use crate::config::ChatConfig;
use crate::error::Result;
use crate::name_generator::generate_nickname;
use crate::network::ZenohPubSub;
use crate::room::ChatRoom;
use crate::types::PeerId;

/// Extension trait for zenoh::Session to join chat rooms
pub trait SessionExt {
    /// Join a chat room on this session
    ///
    /// # Example
    /// ```no_run
    /// use zenoh_chat::SessionExt;
    ///
    /// # async fn example() {
    /// let session = zenoh::open(zenoh::Config::default()).await.unwrap();
    /// let room = session
    ///     .join_chat_room("lobby")
    ///     .nickname("alice")
    ///     .await
    ///     .unwrap();
    /// room.publish("hi").await.unwrap();
    /// # }
    /// ```
    fn join_chat_room(&self, room_name: impl Into<String>) -> ChatRoomBuilder<'_>;
}

impl SessionExt for zenoh::Session {
    fn join_chat_room(&self, room_name: impl Into<String>) -> ChatRoomBuilder<'_> {
        ChatRoomBuilder::new(self, room_name.into())
    }
}

/// Builder for joining a chat room over Zenoh
#[must_use = "Resolvables do nothing unless you resolve them using `.await`"]
#[derive(Debug)]
pub struct ChatRoomBuilder<'a> {
    session: &'a zenoh::Session,
    room_name: String,
    nickname: Option<String>,
    peer_id: Option<PeerId>,
    config: ChatConfig,
    cancel: CancellationToken,
}

impl<'a> ChatRoomBuilder<'a> {
    fn new(session: &'a zenoh::Session, room_name: String) -> Self {
        Self {
            session,
            room_name,
            nickname: None,
            peer_id: None,
            config: ChatConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the nickname (a generated one is used otherwise)
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Override the peer id (defaults to the session's Zenoh id)
    pub fn peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = Some(peer_id);
        self
    }

    /// Set the chat configuration
    pub fn config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the session context; cancelling it ends the room's activity
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Resolvable for ChatRoomBuilder<'_> {
    type To = Result<ChatRoom<ZenohPubSub>>;
}

impl<'a> std::future::IntoFuture for ChatRoomBuilder<'a> {
    type Output = <Self as Resolvable>::To;
    type IntoFuture =
        std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let mut pubsub = ZenohPubSub::new(self.session.clone());
            if let Some(peer_id) = self.peer_id {
                pubsub = pubsub.with_peer_id(peer_id);
            }
            let nickname = self.nickname.unwrap_or_else(generate_nickname);
            ChatRoom::join(self.cancel, pubsub, nickname, self.room_name, &self.config).await
        })
    }
}
