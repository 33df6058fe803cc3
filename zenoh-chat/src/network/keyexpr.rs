//! Key expression layout of a chat room on Zenoh
//!
//! For a room id `R` (for example `chat-room:lobby`):
//!
//! - `R/msg/<peer_id>`: messages published by `<peer_id>`
//! - `R/msg/*`: subscription covering every publisher in the room
//! - `R/peer/<peer_id>`: liveliness token announcing room membership
//! - `R/peer/*`: liveliness subscription tracking the room members

use zenoh::key_expr::KeyExpr;

use crate::error::{ChatError, Result};
use crate::types::PeerId;

const MESSAGE_CHUNK: &str = "msg";
const PEER_CHUNK: &str = "peer";

/// Key expressions of a single room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomKeyexpr {
    room_id: String,
}

impl RoomKeyexpr {
    /// Create the key expression set for a room id
    ///
    /// Fails when the room id is empty or contains one of `/ * $ ? # @`.
    pub fn new(room_id: &str) -> Result<Self> {
        validate_chunk(room_id).map_err(ChatError::InvalidRoomId)?;
        Ok(Self {
            room_id: room_id.to_string(),
        })
    }

    /// Get the room id
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Key on which `peer_id` publishes its messages
    pub fn message(&self, peer_id: &PeerId) -> Result<KeyExpr<'static>> {
        self.build(MESSAGE_CHUNK, peer_id_chunk(peer_id)?)
    }

    /// Key matching messages of every peer in the room
    pub fn message_lookup(&self) -> Result<KeyExpr<'static>> {
        self.build(MESSAGE_CHUNK, "*")
    }

    /// Liveliness key announcing that `peer_id` is in the room
    pub fn peer(&self, peer_id: &PeerId) -> Result<KeyExpr<'static>> {
        self.build(PEER_CHUNK, peer_id_chunk(peer_id)?)
    }

    /// Liveliness key matching every member of the room
    pub fn peer_lookup(&self) -> Result<KeyExpr<'static>> {
        self.build(PEER_CHUNK, "*")
    }

    /// Extract the publisher of a message key (`R/msg/<peer_id>`)
    pub fn message_origin(&self, keyexpr: &str) -> Option<PeerId> {
        self.parse(MESSAGE_CHUNK, keyexpr)
    }

    /// Extract the member of a liveliness key (`R/peer/<peer_id>`)
    pub fn peer_member(&self, keyexpr: &str) -> Option<PeerId> {
        self.parse(PEER_CHUNK, keyexpr)
    }

    fn build(&self, kind: &str, last: &str) -> Result<KeyExpr<'static>> {
        let keyexpr = KeyExpr::try_from(format!("{}/{}/{}", self.room_id, kind, last))?;
        Ok(keyexpr.into_owned())
    }

    fn parse(&self, kind: &str, keyexpr: &str) -> Option<PeerId> {
        let rest = keyexpr.strip_prefix(self.room_id.as_str())?;
        let rest = rest.strip_prefix('/')?;
        let id = rest.strip_prefix(kind)?.strip_prefix('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(PeerId::new(id))
    }
}

fn peer_id_chunk(peer_id: &PeerId) -> Result<&str> {
    validate_chunk(peer_id.as_str())
        .map_err(|reason| ChatError::Transport(format!("peer id unusable as key chunk: {}", reason)))?;
    Ok(peer_id.as_str())
}

/// Check that a string can be used as a single keyexpr chunk
fn validate_chunk(s: &str) -> std::result::Result<(), String> {
    if s.is_empty() {
        return Err("value cannot be empty".to_string());
    }
    if let Some(ch) = s.chars().find(|ch| matches!(ch, '/' | '*' | '$' | '?' | '#' | '@')) {
        return Err(format!("'{}' contains invalid character '{}'", s, ch));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_keyexpr_creation() {
        let keys = RoomKeyexpr::new("chat-room:lobby").unwrap();
        let peer = PeerId::new("a1b2c3");

        assert_eq!(keys.room_id(), "chat-room:lobby");
        assert_eq!(keys.message(&peer).unwrap().as_str(), "chat-room:lobby/msg/a1b2c3");
        assert_eq!(keys.message_lookup().unwrap().as_str(), "chat-room:lobby/msg/*");
        assert_eq!(keys.peer(&peer).unwrap().as_str(), "chat-room:lobby/peer/a1b2c3");
        assert_eq!(keys.peer_lookup().unwrap().as_str(), "chat-room:lobby/peer/*");
    }

    #[test]
    fn test_message_origin_roundtrip() {
        let keys = RoomKeyexpr::new("chat-room:lobby").unwrap();
        let peer = PeerId::new("a1b2c3");
        let keyexpr = keys.message(&peer).unwrap();

        assert_eq!(keys.message_origin(keyexpr.as_str()), Some(peer.clone()));
        assert_eq!(keys.peer_member(keyexpr.as_str()), None);

        let keyexpr = keys.peer(&peer).unwrap();
        assert_eq!(keys.peer_member(keyexpr.as_str()), Some(peer));
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        let keys = RoomKeyexpr::new("chat-room:lobby").unwrap();

        assert_eq!(keys.message_origin("chat-room:other/msg/a1"), None);
        assert_eq!(keys.message_origin("chat-room:lobbyx/msg/a1"), None);
        assert_eq!(keys.message_origin("chat-room:lobby/msg/a1/extra"), None);
        assert_eq!(keys.message_origin("chat-room:lobby/msg/"), None);
        assert_eq!(keys.message_origin("chat-room:lobby"), None);
    }

    #[test]
    fn test_invalid_room_ids() {
        for room_id in ["", "chat-room:a/b", "chat-room:*", "chat-room:$x", "r?", "r#", "r@"] {
            match RoomKeyexpr::new(room_id) {
                Err(ChatError::InvalidRoomId(_)) => {}
                other => panic!("Expected InvalidRoomId for {:?}, got {:?}", room_id, other),
            }
        }
    }

    #[test]
    fn test_invalid_peer_id() {
        let keys = RoomKeyexpr::new("chat-room:lobby").unwrap();
        assert!(matches!(
            keys.message(&PeerId::new("bad/peer")),
            Err(ChatError::Transport(_))
        ));
    }
}
