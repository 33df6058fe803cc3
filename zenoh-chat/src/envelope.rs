//! Wire format of chat messages
//!
//! Every message exchanged in a room is a JSON object:
//!
//! ```text
//! { "Message": <string>, "SenderID": <string>, "SenderNick": <string> }
//! ```
//!
//! Field names are fixed so independent implementations sharing a room can
//! read each other. Unknown fields are ignored, missing or `null` fields decode
//! as empty strings, and anything that is not an object of this shape is a
//! decode error.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// One chat message as sent over the wire and handed to the session loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatEnvelope {
    /// User-authored text
    #[serde(rename = "Message", deserialize_with = "null_as_empty")]
    pub text: String,

    /// Transport identity of the sender
    #[serde(rename = "SenderID", deserialize_with = "null_as_empty")]
    pub sender_id: String,

    /// Display name chosen by the sender
    #[serde(rename = "SenderNick", deserialize_with = "null_as_empty")]
    pub sender_nick: String,
}

impl ChatEnvelope {
    /// Create a new envelope
    pub fn new(
        text: impl Into<String>,
        sender_id: impl Into<String>,
        sender_nick: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender_id: sender_id.into(),
            sender_nick: sender_nick.into(),
        }
    }

    /// Serialize the envelope into its JSON wire form
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse an envelope from its JSON wire form
    ///
    /// Only a JSON object is accepted; arrays would otherwise be read
    /// positionally.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom("chat message must be a JSON object").into());
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
