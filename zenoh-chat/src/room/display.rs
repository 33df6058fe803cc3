//! Display side of a chat session

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ChatError;
use crate::types::PeerId;

/// Who authored a rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrigin {
    /// Typed by the local user (echoed before the network confirms anything)
    Local,
    /// Received from another peer
    Remote,
}

/// One line of the message panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Who authored the line
    pub origin: LineOrigin,
    /// Nickname shown in front of the text
    pub nick: String,
    /// Message text
    pub text: String,
}

impl ChatLine {
    /// Line echoing the local user's own message
    pub fn local(nick: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: LineOrigin::Local,
            nick: nick.into(),
            text: text.into(),
        }
    }

    /// Line showing a message from another peer
    pub fn remote(nick: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: LineOrigin::Remote,
            nick: nick.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for ChatLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>: {}", self.nick, self.text)
    }
}

/// Peer panel label: the last `len` characters of the peer id
pub fn peer_label(peer: &PeerId, len: usize) -> String {
    peer.tail(len).to_string()
}

/// Rendering target driven by the session loop
///
/// The session loop is the only caller, so implementations never see
/// concurrent calls.
pub trait DisplaySink: Send {
    /// Append a line to the message panel
    fn append_line(&mut self, line: ChatLine);

    /// Replace the content of the peer panel
    fn set_peers(&mut self, labels: Vec<String>);

    /// Report a non-fatal error, such as a publish the transport refused
    fn report_error(&mut self, _error: &ChatError) {}

    /// Bring the screen up to date with everything appended so far
    fn redraw(&mut self) -> std::io::Result<()>;
}

#[derive(Debug, Default)]
struct TranscriptState {
    lines: Vec<ChatLine>,
    peers: Vec<String>,
    errors: Vec<String>,
    redraws: usize,
}

/// Headless display keeping everything it is asked to render
///
/// Clones share the same record, so a caller can keep one clone to inspect
/// what the session loop rendered after the session took ownership of the other.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    state: Arc<Mutex<TranscriptState>>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines appended so far
    pub fn lines(&self) -> Vec<ChatLine> {
        self.lock().lines.clone()
    }

    /// Current peer panel content
    pub fn peers(&self) -> Vec<String> {
        self.lock().peers.clone()
    }

    /// Errors reported so far
    pub fn errors(&self) -> Vec<String> {
        self.lock().errors.clone()
    }

    /// Number of redraws requested
    pub fn redraws(&self) -> usize {
        self.lock().redraws
    }

    fn lock(&self) -> MutexGuard<'_, TranscriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplaySink for Transcript {
    fn append_line(&mut self, line: ChatLine) {
        self.lock().lines.push(line);
    }

    fn set_peers(&mut self, labels: Vec<String>) {
        self.lock().peers = labels;
    }

    fn report_error(&mut self, error: &ChatError) {
        self.lock().errors.push(error.to_string());
    }

    fn redraw(&mut self) -> std::io::Result<()> {
        self.lock().redraws += 1;
        Ok(())
    }
}
