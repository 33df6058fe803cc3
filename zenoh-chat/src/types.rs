/// Core types for the zenoh-chat library

/// Stable textual identity of a peer, assigned by the transport
///
/// The chat core never interprets the contents; it only compares ids for
/// loop-back suppression and shows their tail in the peer panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id from its textual form
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `len` characters of the id (the whole id when it is shorter)
    pub fn tail(&self, len: usize) -> &str {
        let count = self.0.chars().count();
        if count <= len {
            return &self.0;
        }
        match self.0.char_indices().nth(count - len) {
            Some((offset, _)) => &self.0[offset..],
            None => &self.0,
        }
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        PeerId(id)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        PeerId(id.to_string())
    }
}

impl PartialEq<str> for PeerId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
