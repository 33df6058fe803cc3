//! Session event loop
//!
//! [`ChatSession::run`] is the single consumer of both the inbound message
//! queue and the user input queue and the only writer to the display. Each
//! iteration waits on one `select!` point for the first ready event:
//!
//! - a command from the input surface (publish a line, or stop)
//! - a message received from another peer
//! - the periodic peer panel refresh
//! - cancellation of the session context
//!
//! `select!` picks randomly among ready branches, so a busy room cannot starve
//! user input and vice versa.
//!
//! Publishing happens inline: while the transport is slow to accept a message,
//! incoming messages and peer refreshes wait. There is no per-publish timeout,
//! only cancellation of the session context interrupts it.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::config::ChatConfig;
use crate::envelope::ChatEnvelope;
use crate::network::PubSub;
use crate::room::chat_room::ChatRoom;
use crate::room::display::{peer_label, ChatLine, DisplaySink};
use crate::room::input::{InputHandle, SessionCommand};

/// Lifecycle of a session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handling events
    Running,
    /// A stop trigger was accepted, the loop is winding down
    Terminating,
    /// The loop has returned; terminal
    Stopped,
}

/// What ended a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The session context was cancelled
    Cancelled,
    /// `/quit` was entered or the owner asked the loop to stop
    StopRequested,
    /// The subscription failed and no more messages can arrive
    InboundClosed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "session cancelled"),
            StopReason::StopRequested => write!(f, "stop requested"),
            StopReason::InboundClosed => write!(f, "room subscription closed"),
        }
    }
}

/// One event taken from the select point
#[derive(Debug)]
enum SessionEvent {
    Command(SessionCommand),
    Inbound(Option<ChatEnvelope>),
    RefreshPeers,
    Cancelled,
}

/// Event loop of one joined room
pub struct ChatSession<P: PubSub, D: DisplaySink> {
    room: ChatRoom<P>,
    display: D,
    command_tx: flume::Sender<SessionCommand>,
    /// Taken when the loop stops, which closes the input queue
    command_rx: Option<flume::Receiver<SessionCommand>>,
    peer_refresh_interval: Duration,
    peer_label_len: usize,
    state: SessionState,
    stop_reason: Option<StopReason>,
}

impl<P: PubSub, D: DisplaySink> std::fmt::Debug for ChatSession<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("room", &self.room)
            .field("state", &self.state)
            .field("stop_reason", &self.stop_reason)
            .finish()
    }
}

impl<P: PubSub, D: DisplaySink> ChatSession<P, D> {
    /// Create a session loop for a joined room
    pub fn new(room: ChatRoom<P>, display: D, config: &ChatConfig) -> Self {
        let (command_tx, command_rx) = flume::bounded(config.input_capacity);
        Self {
            room,
            display,
            command_tx,
            command_rx: Some(command_rx),
            peer_refresh_interval: config.peer_refresh_interval,
            peer_label_len: config.peer_label_len,
            state: SessionState::Running,
            stop_reason: None,
        }
    }

    /// Get a handle for feeding user input to this session
    pub fn input(&self) -> InputHandle {
        InputHandle::new(self.command_tx.clone())
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The joined room
    pub fn room(&self) -> &ChatRoom<P> {
        &self.room
    }

    /// The display driven by this session
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run the loop until a stop trigger is accepted
    ///
    /// Returns the trigger that ended the session. A stopped session never
    /// runs again; calling this afterwards returns the same reason at once.
    pub async fn run(&mut self) -> StopReason {
        let mut peer_refresh = tokio::time::interval(self.peer_refresh_interval);
        peer_refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.room.cancellation().clone();

        while self.state == SessionState::Running {
            let Some(command_rx) = self.command_rx.as_ref() else {
                break;
            };
            let event = tokio::select! {
                () = cancel.cancelled() => SessionEvent::Cancelled,
                // The session keeps a sender of its own, so receiving never fails
                Ok(command) = command_rx.recv_async() => SessionEvent::Command(command),
                envelope = self.room.next_message() => SessionEvent::Inbound(envelope),
                _ = peer_refresh.tick() => SessionEvent::RefreshPeers,
            };
            self.dispatch(event).await;
        }

        self.finish()
    }

    async fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Command(SessionCommand::Publish(text)) => {
                self.publish(text).await;
            }
            SessionEvent::Command(SessionCommand::Stop) => {
                self.terminate(StopReason::StopRequested);
            }
            SessionEvent::Inbound(Some(envelope)) => {
                self.render(ChatLine::remote(envelope.sender_nick, envelope.text));
            }
            SessionEvent::Inbound(None) => {
                // Cancellation also closes the inbound queue, report the cause
                let reason = if self.room.cancellation().is_cancelled() {
                    StopReason::Cancelled
                } else {
                    StopReason::InboundClosed
                };
                self.terminate(reason);
            }
            SessionEvent::RefreshPeers => {
                self.refresh_peers().await;
            }
            SessionEvent::Cancelled => {
                self.terminate(StopReason::Cancelled);
            }
        }
    }

    async fn publish(&mut self, text: String) {
        if let Err(e) = self.room.publish(text.as_str()).await {
            tracing::warn!("Room '{}' publish error: {}", self.room.room_id(), e);
            self.display.report_error(&e);
        }
        // Echoed whether or not the transport took the message
        let line = ChatLine::local(self.room.nickname(), text);
        self.render(line);
    }

    async fn refresh_peers(&mut self) {
        match self.room.list_peers().await {
            Ok(peers) => {
                let labels = peers
                    .iter()
                    .map(|peer| peer_label(peer, self.peer_label_len))
                    .collect();
                self.display.set_peers(labels);
                self.redraw();
            }
            Err(e) => {
                tracing::debug!("Room '{}' peer refresh failed: {}", self.room.room_id(), e);
            }
        }
    }

    fn render(&mut self, line: ChatLine) {
        self.display.append_line(line);
        self.redraw();
    }

    fn redraw(&mut self) {
        if let Err(e) = self.display.redraw() {
            tracing::warn!("Room '{}' redraw failed: {}", self.room.room_id(), e);
        }
    }

    /// Accept a stop trigger; only the first one counts
    fn terminate(&mut self, reason: StopReason) -> bool {
        if self.state != SessionState::Running {
            tracing::debug!(
                "Room '{}' ignoring stop trigger ({}), already {:?}",
                self.room.room_id(),
                reason,
                self.state
            );
            return false;
        }
        tracing::info!("Room '{}' session terminating: {}", self.room.room_id(), reason);
        self.state = SessionState::Terminating;
        self.stop_reason = Some(reason);
        true
    }

    fn finish(&mut self) -> StopReason {
        // Pending and future input is refused from here on
        self.command_rx = None;
        if self.state == SessionState::Terminating {
            self.redraw();
            self.state = SessionState::Stopped;
        }
        self.stop_reason.unwrap_or(StopReason::StopRequested)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::error::ChatError;
    use crate::network::memory::{MemorySubscription, MemoryTopic};
    use crate::network::{MemoryBus, MemoryPeer, PubSub, Subscription, Topic};
    use crate::room::display::{LineOrigin, Transcript};
    use crate::room::input::Submitted;

    const ROOM: &str = "chat-room:lobby";

    async fn start_session(
        bus: &MemoryBus,
        peer: &str,
        nick: &str,
        cancel: CancellationToken,
        config: &ChatConfig,
    ) -> (ChatSession<MemoryPeer, Transcript>, Transcript) {
        let room = ChatRoom::join(cancel, bus.peer(peer), nick, "lobby", config)
            .await
            .unwrap();
        let transcript = Transcript::new();
        (ChatSession::new(room, transcript.clone(), config), transcript)
    }

    async fn run_within(session: &mut ChatSession<MemoryPeer, Transcript>) -> StopReason {
        tokio::time::timeout(Duration::from_secs(5), session.run())
            .await
            .expect("session stopped in time")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition reached in time");
    }

    /// Raw subscription of a bystander, to see exactly what went over the bus
    async fn wiretap(bus: &MemoryBus) -> (MemoryTopic, MemorySubscription) {
        let topic = bus.peer("wiretap").join(ROOM).await.unwrap();
        let subscription = topic.subscribe().await.unwrap();
        (topic, subscription)
    }

    async fn assert_silent(subscription: &mut impl Subscription) {
        let next = tokio::time::timeout(Duration::from_millis(100), subscription.next()).await;
        assert!(next.is_err(), "unexpected message on the bus: {:?}", next);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_quit_stops_without_publishing() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (_tap_topic, mut tap) = wiretap(&bus).await;
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let input = session.input();

        assert_eq!(input.submit("/quit").unwrap(), Submitted::Quit);
        assert_eq!(run_within(&mut session).await, StopReason::StopRequested);

        assert_eq!(session.state(), SessionState::Stopped);
        assert!(transcript.lines().is_empty());
        assert_silent(&mut tap).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_empty_line_is_never_published() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (_tap_topic, mut tap) = wiretap(&bus).await;
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let input = session.input();

        assert_eq!(input.submit("").unwrap(), Submitted::Ignored);
        input.stop().unwrap();
        run_within(&mut session).await;

        assert!(transcript.lines().is_empty());
        assert_silent(&mut tap).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_input_is_published_and_echoed() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let (other, _) = start_session(&bus, "P2", "bob", CancellationToken::new(), &config).await;
        let input = session.input();

        input.submit("hello").unwrap();
        input.submit("/quit").unwrap();
        run_within(&mut session).await;

        assert_eq!(transcript.lines(), vec![ChatLine::local("alice", "hello")]);
        let received = tokio::time::timeout(Duration::from_secs(5), other.room().next_message())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.text, "hello");
        assert_eq!(received.sender_id, "P1");
        assert_eq!(received.sender_nick, "alice");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_publish_failure_still_echoes() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let input = session.input();
        bus.fail_publishes(ROOM, true);

        input.submit("lost").unwrap();
        input.submit("/quit").unwrap();
        assert_eq!(run_within(&mut session).await, StopReason::StopRequested);

        assert_eq!(transcript.lines(), vec![ChatLine::local("alice", "lost")]);
        assert_eq!(transcript.errors().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_remote_messages_are_rendered() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let (other, _) = start_session(&bus, "P2", "bob", CancellationToken::new(), &config).await;
        let input = session.input();

        let running = tokio::spawn(async move {
            let reason = session.run().await;
            (session, reason)
        });

        other.room().publish("yo").await.unwrap();
        wait_until(|| !transcript.lines().is_empty()).await;
        input.stop().unwrap();
        let (_session, reason) = running.await.unwrap();

        assert_eq!(reason, StopReason::StopRequested);
        let lines = transcript.lines();
        assert_eq!(lines, vec![ChatLine::remote("bob", "yo")]);
        assert_eq!(lines[0].origin, LineOrigin::Remote);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_peer_panel_shows_label_tails() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default().with_peer_refresh_ms(20);
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let input = session.input();

        let running = tokio::spawn(async move {
            session.run().await;
        });

        let _bob = ChatRoom::join(
            CancellationToken::new(),
            bus.peer("12D3KooWBob-abcdefgh"),
            "bob",
            "lobby",
            &config,
        )
        .await
        .unwrap();

        wait_until(|| transcript.peers() == vec!["abcdefgh".to_string()]).await;
        input.stop().unwrap();
        running.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_cancellation_stops_session() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let cancel = CancellationToken::new();
        let (mut session, transcript) = start_session(&bus, "P1", "alice", cancel.clone(), &config).await;

        cancel.cancel();

        assert_eq!(run_within(&mut session).await, StopReason::Cancelled);
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(transcript.redraws() >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_dropped_input_handles_do_not_stop_session() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (mut session, _transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        drop(session.input());

        let idle = tokio::time::timeout(Duration::from_millis(200), session.run()).await;
        assert!(idle.is_err(), "session stopped without a trigger: {:?}", idle);
        assert_eq!(session.state(), SessionState::Running);

        // A fresh handle still reaches the loop
        session.input().submit("/quit").unwrap();
        assert_eq!(run_within(&mut session).await, StopReason::StopRequested);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_subscription_failure_stops_session() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (mut session, _transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;

        bus.close_subscriptions(ROOM);

        assert_eq!(run_within(&mut session).await, StopReason::InboundClosed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_concurrent_stop_triggers_act_once() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let cancel = CancellationToken::new();
        let (mut session, _transcript) = start_session(&bus, "P1", "alice", cancel.clone(), &config).await;
        let input = session.input();

        input.submit("/quit").unwrap();
        cancel.cancel();

        let reason = run_within(&mut session).await;
        assert!(matches!(reason, StopReason::Cancelled | StopReason::StopRequested));
        assert_eq!(session.state(), SessionState::Stopped);

        // Stopped is terminal
        assert_eq!(run_within(&mut session).await, reason);
        assert!(!session.terminate(StopReason::InboundClosed));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_input_after_stop_is_refused() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (_tap_topic, mut tap) = wiretap(&bus).await;
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let input = session.input();

        input.submit("/quit").unwrap();
        input.submit("queued after quit").unwrap();
        run_within(&mut session).await;

        assert!(matches!(input.submit("late"), Err(ChatError::SessionClosed)));
        assert!(input.is_closed());
        assert!(transcript.lines().is_empty());
        assert_silent(&mut tap).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_busy_room_does_not_starve_input() {
        let bus = MemoryBus::new();
        let config = ChatConfig::default();
        let (mut session, transcript) =
            start_session(&bus, "P1", "alice", CancellationToken::new(), &config).await;
        let input = session.input();

        for i in 0..config.inbound_capacity {
            let envelope = ChatEnvelope::new(i.to_string(), "P2", "bob");
            bus.inject(ROOM, "P2", envelope.encode().unwrap());
        }
        wait_until(|| session.room().pending_messages() == config.inbound_capacity).await;
        input.stop().unwrap();

        assert_eq!(run_within(&mut session).await, StopReason::StopRequested);
        assert!(transcript.lines().len() < config.inbound_capacity);
    }
}
