/// Error types for the zenoh-chat library
use thiserror::Error;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors that can occur in zenoh-chat operations
#[derive(Debug, Error)]
pub enum ChatError {
    /// Zenoh-related errors
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// Envelope encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Room id cannot be used as a transport topic
    #[error("Invalid room id: {0}. Must be a valid keyexpr prefix (no /, *, $, ?, #, @)")]
    InvalidRoomId(String),

    /// Transport refused an operation (join, subscribe, publish)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Subscription reached a terminal failure, no more messages will arrive
    #[error("Subscription closed: {0}")]
    SubscriptionClosed(String),

    /// The session context was cancelled while an operation was in flight
    #[error("Session cancelled")]
    Cancelled,

    /// The session loop is no longer accepting input
    #[error("Session closed")]
    SessionClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
