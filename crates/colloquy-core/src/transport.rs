//! Transport ports: what the core needs from a network binding.
//!
//! A [`Transport`] starts connection attempts; each attempt yields a
//! [`Link`] for sending and reports everything else through an
//! [`EventSink`]. Implementations live in `colloquy-infra`
//! (WebSocket, streaming HTTP) and in this crate's tests (a mock).
//!
//! Every event is tagged with the channel and the link *generation* that
//! produced it, so the coordinator can ignore events from links it already
//! discarded (after `close()` or a reconnect).

use tokio::sync::mpsc;

use colloquy_types::channel::ChannelId;
use colloquy_types::config::{ChannelConfig, ReconnectConfig};
use colloquy_types::error::ConnectionError;
use colloquy_types::frame::RawInput;
use colloquy_types::message::OutboundMessage;

/// Events a transport reports for one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link accepts sends; the backend answers with the first request.
    Ready,
    /// Handshake finished (or the backend answered a `Ready` link).
    Opened,
    /// Raw inbound data.
    Frame(RawInput),
    /// The link is gone. `was_clean` mirrors the close handshake.
    Closed { was_clean: bool },
}

/// Everything the coordinator's event loop can receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    Transport(TransportEvent),
    /// A scheduled reconnect delay elapsed.
    ReconnectDue,
}

/// One queued event, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub channel: ChannelId,
    pub generation: u64,
    pub kind: SessionEventKind,
}

/// Cloneable handle a transport uses to report events for one link.
#[derive(Debug, Clone)]
pub struct EventSink {
    channel: ChannelId,
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn new(
        channel: ChannelId,
        generation: u64,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            channel,
            generation,
            tx,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ready(&self) {
        self.emit(SessionEventKind::Transport(TransportEvent::Ready));
    }

    pub fn opened(&self) {
        self.emit(SessionEventKind::Transport(TransportEvent::Opened));
    }

    pub fn frame(&self, input: RawInput) {
        self.emit(SessionEventKind::Transport(TransportEvent::Frame(input)));
    }

    pub fn closed(&self, was_clean: bool) {
        self.emit(SessionEventKind::Transport(TransportEvent::Closed { was_clean }));
    }

    pub(crate) fn reconnect_due(&self) {
        self.emit(SessionEventKind::ReconnectDue);
    }

    /// Whether the session side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn emit(&self, kind: SessionEventKind) {
        // The session may already be gone; late events are dropped.
        let _ = self.tx.send(SessionEvent {
            channel: self.channel,
            generation: self.generation,
            kind,
        });
    }
}

/// One live connection attempt.
pub trait Link: Send {
    /// Queue a message for the backend.
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError>;

    /// Tear the connection down. Must not report `Closed` afterwards.
    fn close(&mut self);
}

/// A network binding that can start connection attempts.
///
/// `open` must not block: it starts the attempt (typically by spawning a
/// task) and reports `Opened` or `Closed` through the sink later. Bindings
/// without a separate handshake report `Ready` instead and `Opened` once
/// the backend first answers successfully. A synchronous `Err` is treated
/// like a failed handshake.
pub trait Transport: Send + Sync {
    fn open(
        &self,
        channel: &ChannelConfig,
        reconnect: &ReconnectConfig,
        sink: EventSink,
    ) -> Result<Box<dyn Link>, ConnectionError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn open(
        &self,
        channel: &ChannelConfig,
        reconnect: &ReconnectConfig,
        sink: EventSink,
    ) -> Result<Box<dyn Link>, ConnectionError> {
        (**self).open(channel, reconnect, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_tags_events_with_channel_and_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(ChannelId(1), 7, tx);

        sink.ready();
        sink.opened();
        sink.frame(RawInput::Text("hi".into()));
        sink.closed(false);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.channel, ChannelId(1));
        assert_eq!(first.generation, 7);
        assert_eq!(first.kind, SessionEventKind::Transport(TransportEvent::Ready));
        assert_eq!(
            rx.try_recv().unwrap().kind,
            SessionEventKind::Transport(TransportEvent::Opened)
        );
        assert_eq!(
            rx.try_recv().unwrap().kind,
            SessionEventKind::Transport(TransportEvent::Frame(RawInput::Text("hi".into())))
        );
        assert_eq!(
            rx.try_recv().unwrap().kind,
            SessionEventKind::Transport(TransportEvent::Closed { was_clean: false })
        );
    }

    #[test]
    fn sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(ChannelId(0), 0, tx);
        drop(rx);
        assert!(sink.is_closed());
        sink.opened();
    }
}
