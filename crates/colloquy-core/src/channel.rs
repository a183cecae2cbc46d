//! A single channel: one backend endpoint with its own connection, decoder
//! and turn accumulator.
//!
//! The channel is the Connection Lifecycle Manager of the session. It owns
//! the current [`Link`], applies the [`ChannelLifecycle`] policy to transport
//! events, and schedules reconnects as cancellable timer tasks that report
//! back through the same event queue as the transport.
//!
//! Nothing is replayed across links: an exchange whose connection drops
//! before its sentinel is marked interrupted, and every new link starts
//! with an empty line buffer.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use colloquy_types::channel::{ChannelId, ConnectionState};
use colloquy_types::config::{ChannelConfig, ProtocolConfig, ReconnectConfig};
use colloquy_types::error::ConnectionError;
use colloquy_types::frame::RawInput;
use colloquy_types::message::OutboundMessage;
use colloquy_types::snapshot::ChannelSnapshot;
use colloquy_types::turn::Turn;

use crate::accumulator::{SessionUpdate, TurnAccumulator};
use crate::decoder::{DecodeMode, FrameDecoder};
use crate::lifecycle::{ChannelLifecycle, CloseOutcome, OpenOutcome};
use crate::transport::{EventSink, Link, SessionEvent, SessionEventKind, Transport, TransportEvent};

/// Result of feeding one event to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The link became usable.
    Opened,
    /// The backend answered on a link that was already usable.
    Confirmed,
    /// Inbound data was decoded and accumulated.
    Updated(Vec<SessionUpdate>),
    /// The connection went away; the lifecycle decided what happens next.
    Closed(CloseOutcome),
    /// A new connection attempt was started.
    Reconnecting,
    /// Stale or suppressed event.
    Ignored,
}

pub struct Channel {
    id: ChannelId,
    config: ChannelConfig,
    reconnect: ReconnectConfig,
    lifecycle: ChannelLifecycle,
    decoder: FrameDecoder,
    accumulator: TurnAccumulator,
    link: Option<Box<dyn Link>>,
    /// Bumped for every new link and on close; older events are stale.
    generation: u64,
    reconnect_timer: Option<CancellationToken>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Channel {
    pub fn new(
        id: ChannelId,
        config: ChannelConfig,
        protocol: &ProtocolConfig,
        reconnect: ReconnectConfig,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let decoder = FrameDecoder::new(DecodeMode::from(config.transport), protocol);
        Self {
            id,
            lifecycle: ChannelLifecycle::new(&reconnect),
            config,
            reconnect,
            decoder,
            accumulator: TurnAccumulator::new(),
            link: None,
            generation: 0,
            reconnect_timer: None,
            events,
        }
    }

    /// Explicit open: reset the retry budget and start a connection attempt.
    pub fn open(&mut self, transport: &dyn Transport) {
        self.cancel_reconnect_timer();
        self.drop_link();
        self.lifecycle.begin_open();
        tracing::info!(channel = %self.id, endpoint = %self.config.endpoint, "opening channel");
        self.start_attempt(transport);
    }

    /// Send a message. Rejected unless the channel is open.
    pub fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        let state = self.lifecycle.state();
        let link = match (&self.link, state) {
            (Some(link), ConnectionState::Open) => link,
            _ => {
                tracing::warn!(
                    channel = %self.id,
                    %state,
                    kind = message.kind(),
                    "send rejected: channel is not open"
                );
                return Err(ConnectionError::NotOpen { state });
            }
        };
        tracing::debug!(channel = %self.id, kind = message.kind(), "sending");
        link.send(message)
    }

    /// Consumer teardown. No reconnect may fire after this.
    pub fn close(&mut self) {
        if self.lifecycle.is_manually_closed() && self.link.is_none() {
            return;
        }
        self.lifecycle.close();
        self.cancel_reconnect_timer();
        self.drop_link();
        self.accumulator.interrupt();
        self.generation += 1;
        tracing::info!(channel = %self.id, "channel closed");
    }

    /// Apply one queued event.
    pub fn handle(&mut self, event: SessionEvent, transport: &dyn Transport) -> ChannelOutcome {
        if event.generation != self.generation {
            tracing::trace!(
                channel = %self.id,
                event_generation = event.generation,
                generation = self.generation,
                "ignoring stale event"
            );
            return ChannelOutcome::Ignored;
        }

        match event.kind {
            SessionEventKind::Transport(TransportEvent::Ready) => {
                if !self.lifecycle.on_ready() {
                    return ChannelOutcome::Ignored;
                }
                tracing::info!(channel = %self.id, endpoint = %self.config.endpoint, "channel ready");
                ChannelOutcome::Opened
            }
            SessionEventKind::Transport(TransportEvent::Opened) => match self.lifecycle.on_open() {
                OpenOutcome::Opened => {
                    tracing::info!(channel = %self.id, endpoint = %self.config.endpoint, "channel open");
                    ChannelOutcome::Opened
                }
                OpenOutcome::Confirmed => {
                    tracing::debug!(channel = %self.id, "backend answered, retry budget restored");
                    ChannelOutcome::Confirmed
                }
                OpenOutcome::Ignored => ChannelOutcome::Ignored,
            },
            SessionEventKind::Transport(TransportEvent::Frame(input)) => self.ingest(input),
            SessionEventKind::Transport(TransportEvent::Closed { was_clean }) => {
                self.link = None;
                let outcome = self.lifecycle.on_close();
                if outcome != CloseOutcome::Ignored && self.accumulator.interrupt() {
                    tracing::warn!(
                        channel = %self.id,
                        turns = self.accumulator.turns().len(),
                        "connection lost mid-exchange, exchange interrupted"
                    );
                }
                match outcome {
                    CloseOutcome::Reconnect { attempt, delay } => {
                        tracing::warn!(
                            channel = %self.id,
                            was_clean,
                            attempt,
                            max_retries = self.reconnect.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "connection lost, scheduling reconnect"
                        );
                        self.schedule_reconnect(delay);
                    }
                    CloseOutcome::GaveUp { attempts } => {
                        let err = ConnectionError::RetriesExhausted {
                            endpoint: self.config.endpoint.clone(),
                            attempts,
                        };
                        tracing::error!(channel = %self.id, was_clean, "{err}");
                    }
                    CloseOutcome::Ignored => return ChannelOutcome::Ignored,
                }
                ChannelOutcome::Closed(outcome)
            }
            SessionEventKind::ReconnectDue => {
                self.reconnect_timer = None;
                if !self.lifecycle.on_reconnect_due() {
                    return ChannelOutcome::Ignored;
                }
                tracing::info!(
                    channel = %self.id,
                    attempt = self.lifecycle.retries(),
                    "reconnecting"
                );
                self.start_attempt(transport);
                ChannelOutcome::Reconnecting
            }
        }
    }

    /// New exchange: clear turns, drop partial input, wait for a sentinel.
    pub fn begin_exchange(&mut self) {
        self.decoder.reset();
        self.accumulator.reset();
    }

    /// Continue the current exchange without clearing turns.
    pub fn resume_exchange(&mut self) {
        self.decoder.reset();
        self.accumulator.resume();
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            endpoint: self.config.endpoint.clone(),
            state: self.lifecycle.state(),
            turns: self.accumulator.turns().to_vec(),
            loading: self.accumulator.loading(),
            interrupted: self.accumulator.interrupted(),
            failed: self.lifecycle.is_failed(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.state().is_open()
    }

    pub fn is_failed(&self) -> bool {
        self.lifecycle.is_failed()
    }

    pub fn loading(&self) -> bool {
        self.accumulator.loading()
    }

    pub fn interrupted(&self) -> bool {
        self.accumulator.interrupted()
    }

    pub fn turns(&self) -> &[Turn] {
        self.accumulator.turns()
    }

    pub fn retries(&self) -> u32 {
        self.lifecycle.retries()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    fn ingest(&mut self, input: RawInput) -> ChannelOutcome {
        let updates = self
            .decoder
            .decode(input)
            .into_iter()
            .map(|frame| self.accumulator.ingest(frame))
            .collect();
        ChannelOutcome::Updated(updates)
    }

    fn start_attempt(&mut self, transport: &dyn Transport) {
        self.generation += 1;
        // A partial line from the previous link never belongs to this one.
        self.decoder.reset();
        let sink = EventSink::new(self.id, self.generation, self.events.clone());
        match transport.open(&self.config, &self.reconnect, sink.clone()) {
            Ok(link) => self.link = Some(link),
            Err(err) => {
                tracing::warn!(channel = %self.id, error = %err, "connection attempt failed");
                // Same path as a refused handshake.
                sink.closed(false);
            }
        }
    }

    fn schedule_reconnect(&mut self, delay: std::time::Duration) {
        self.cancel_reconnect_timer();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let sink = EventSink::new(self.id, self.generation, self.events.clone());
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => sink.reconnect_due(),
            }
        });
        self.reconnect_timer = Some(token);
    }

    fn cancel_reconnect_timer(&mut self) {
        if let Some(token) = self.reconnect_timer.take() {
            token.cancel();
        }
    }

    fn drop_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.lifecycle.state())
            .field("generation", &self.generation)
            .field("turns", &self.accumulator.turns().len())
            .finish()
    }
}
