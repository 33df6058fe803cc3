//! Input surface feeding the session loop

use crate::error::{ChatError, Result};

/// Line that ends the session instead of being sent
pub const QUIT_COMMAND: &str = "/quit";

/// Commands that can be sent to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Publish a line to the room
    Publish(String),
    /// Stop the session loop
    Stop,
}

/// What happened to a submitted line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Empty line, nothing was queued
    Ignored,
    /// Line queued for publishing
    Queued,
    /// `/quit` entered, a stop request was queued
    Quit,
}

/// Handle used by the input surface to feed the session loop
///
/// Cheap to clone; every clone feeds the same bounded queue. Sends block while
/// the queue is full.
#[derive(Debug, Clone)]
pub struct InputHandle {
    tx: flume::Sender<SessionCommand>,
}

impl InputHandle {
    pub(crate) fn new(tx: flume::Sender<SessionCommand>) -> Self {
        Self { tx }
    }

    /// Interpret a line typed by the user
    ///
    /// Empty lines are dropped and `/quit` turns into a stop request; neither
    /// ever reaches the room.
    pub fn submit(&self, line: impl Into<String>) -> Result<Submitted> {
        let (command, submitted) = match Self::interpret(line.into()) {
            Some(parsed) => parsed,
            None => return Ok(Submitted::Ignored),
        };
        self.tx.send(command).map_err(|_| ChatError::SessionClosed)?;
        Ok(submitted)
    }

    /// Async variant of [`InputHandle::submit`]
    pub async fn submit_async(&self, line: impl Into<String>) -> Result<Submitted> {
        let (command, submitted) = match Self::interpret(line.into()) {
            Some(parsed) => parsed,
            None => return Ok(Submitted::Ignored),
        };
        self.tx
            .send_async(command)
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        Ok(submitted)
    }

    /// Ask the session loop to stop
    pub fn stop(&self) -> Result<()> {
        self.tx
            .send(SessionCommand::Stop)
            .map_err(|_| ChatError::SessionClosed)
    }

    /// Whether the session loop stopped accepting input
    pub fn is_closed(&self) -> bool {
        self.tx.is_disconnected()
    }

    fn interpret(line: String) -> Option<(SessionCommand, Submitted)> {
        if line.is_empty() {
            return None;
        }
        if line == QUIT_COMMAND {
            return Some((SessionCommand::Stop, Submitted::Quit));
        }
        Some((SessionCommand::Publish(line), Submitted::Queued))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_queues_publish() {
        let (tx, rx) = flume::bounded(32);
        let input = InputHandle::new(tx);

        assert_eq!(input.submit("hello").unwrap(), Submitted::Queued);
        assert_eq!(rx.try_recv().unwrap(), SessionCommand::Publish("hello".to_string()));
    }

    #[test]
    fn test_empty_line_is_ignored() {
        let (tx, rx) = flume::bounded(32);
        let input = InputHandle::new(tx);

        assert_eq!(input.submit("").unwrap(), Submitted::Ignored);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_quit_becomes_stop() {
        let (tx, rx) = flume::bounded(32);
        let input = InputHandle::new(tx);

        assert_eq!(input.submit("/quit").unwrap(), Submitted::Quit);
        assert_eq!(rx.try_recv().unwrap(), SessionCommand::Stop);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_quit_must_match_exactly() {
        let (tx, rx) = flume::bounded(32);
        let input = InputHandle::new(tx);

        assert_eq!(input.submit("/quit now").unwrap(), Submitted::Queued);
        assert_eq!(input.submit(" /quit").unwrap(), Submitted::Queued);
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_submit_after_close_fails() {
        let (tx, rx) = flume::bounded(32);
        let input = InputHandle::new(tx);
        drop(rx);

        assert!(input.is_closed());
        assert!(matches!(input.submit("late"), Err(ChatError::SessionClosed)));
        assert!(matches!(input.stop(), Err(ChatError::SessionClosed)));
        // Empty lines never touch the queue
        assert_eq!(input.submit("").unwrap(), Submitted::Ignored);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_submit_async() {
        let (tx, rx) = flume::bounded(32);
        let input = InputHandle::new(tx);

        assert_eq!(input.submit_async("hi").await.unwrap(), Submitted::Queued);
        assert_eq!(
            rx.recv_async().await.unwrap(),
            SessionCommand::Publish("hi".to_string())
        );
    }
}
