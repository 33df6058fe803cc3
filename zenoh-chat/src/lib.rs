//! # zenoh-chat
//!
//! Room-based text chat between peers over a publish/subscribe transport.
//!
//! ## Overview
//!
//! Joining a room subscribes to its topic and starts a background receive
//! task that filters and decodes incoming messages into a bounded queue. A
//! [`ChatSession`] then multiplexes that queue with user input, a periodic
//! peer list refresh and shutdown signals into one serialized loop driving a
//! [`DisplaySink`].
//!
//! The transport is pluggable through the [`network::PubSub`] traits. Zenoh
//! is the production backend ([`SessionExt::join_chat_room`]); an in-memory
//! bus ([`network::MemoryBus`]) runs everything inside one process.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zenoh_chat::{ChatConfig, ChatSession, SessionExt, Transcript};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let session = zenoh::open(zenoh::Config::default()).await?;
//!     let config = ChatConfig::default();
//!
//!     let room = session
//!         .join_chat_room("lobby")
//!         .nickname("alice")
//!         .config(config.clone())
//!         .await?;
//!
//!     let mut chat = ChatSession::new(room, Transcript::new(), &config);
//!     let input = chat.input();
//!     input.submit("hello")?;
//!     input.submit("/quit")?;
//!
//!     let reason = chat.run().await;
//!     println!("Session ended: {}", reason);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod envelope;
pub mod error;
pub mod name_generator;
pub mod network;
pub mod room;
pub mod session_ext;
pub mod types;

// Re-exports for convenience
pub use config::ChatConfig;
pub use envelope::ChatEnvelope;
pub use error::{ChatError, Result};
pub use name_generator::generate_nickname;
pub use room::{
    peer_label, ChatLine, ChatRoom, ChatSession, DisplaySink, InputHandle, LineOrigin,
    SessionState, StopReason, Submitted, Transcript,
};
pub use session_ext::{ChatRoomBuilder, SessionExt};
pub use types::PeerId;
