//! Room-level chat: the topic channel, the input surface, the display seam
//! and the session loop tying them together

pub mod chat_room;
pub mod display;
pub mod input;
pub mod session;

pub use chat_room::ChatRoom;
pub use display::{peer_label, ChatLine, DisplaySink, LineOrigin, Transcript};
pub use input::{InputHandle, SessionCommand, Submitted, QUIT_COMMAND};
pub use session::{ChatSession, SessionState, StopReason};
