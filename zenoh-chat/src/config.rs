//! Configuration for a chat session

use std::time::Duration;

/// Smallest accepted input queue capacity; anything lower stalls typing in normal use
pub const MIN_INPUT_CAPACITY: usize = 32;

/// Main configuration for a chat session
///
/// Passed explicitly when a room is joined and when the session loop is built,
/// so two sessions in the same process can run with different settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Literal prefix prepended to the room name to form the topic name
    pub room_prefix: String,

    /// Capacity of the inbound envelope queue fed by the receive task
    pub inbound_capacity: usize,

    /// Capacity of the queue carrying user input to the session loop
    pub input_capacity: usize,

    /// Period of the peer panel refresh
    pub peer_refresh_interval: Duration,

    /// Number of trailing characters of a peer id shown in the peer panel
    pub peer_label_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            room_prefix: "chat-room:".to_string(),
            inbound_capacity: 128,
            input_capacity: MIN_INPUT_CAPACITY,
            peer_refresh_interval: Duration::from_secs(1),
            peer_label_len: 8,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the room prefix
    pub fn with_room_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.room_prefix = prefix.into();
        self
    }

    /// Set the inbound queue capacity (at least 1)
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity.max(1);
        self
    }

    /// Set the input queue capacity (never below [`MIN_INPUT_CAPACITY`])
    pub fn with_input_capacity(mut self, capacity: usize) -> Self {
        self.input_capacity = capacity.max(MIN_INPUT_CAPACITY);
        self
    }

    /// Set the peer refresh interval in milliseconds
    pub fn with_peer_refresh_ms(mut self, interval_ms: u64) -> Self {
        self.peer_refresh_interval = Duration::from_millis(interval_ms.max(1));
        self
    }

    /// Set how many trailing characters of a peer id are displayed
    pub fn with_peer_label_len(mut self, len: usize) -> Self {
        self.peer_label_len = len;
        self
    }

    /// Topic name for a room: prefix and room name concatenated byte for byte
    pub fn room_id(&self, room_name: &str) -> String {
        format!("{}{}", self.room_prefix, room_name)
    }
}
