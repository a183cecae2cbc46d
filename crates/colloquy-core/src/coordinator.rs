//! Session coordinator: one or two channels behind a single submit.
//!
//! The coordinator owns every [`Channel`] of a session and the single event
//! queue their transports and reconnect timers report into. Events are
//! processed one at a time through `&mut self`, so no two state mutations
//! ever interleave; the only suspension point is waiting for the next event.
//!
//! ```text
//!  transport tasks ──┐
//!  reconnect timers ─┼──► mpsc queue ──► handle() ──► Channel ──► snapshot bus
//!                    ┘                      ▲
//!  submit()/advance() ──────────────────────┘ (fan-out send to every channel)
//! ```
//!
//! Aggregate `loading` is true until **every** channel has seen a sentinel
//! (or lost its connection) since the last accepted submit; channels
//! progress independently.

use tokio::sync::{mpsc, watch};

use colloquy_types::channel::ChannelId;
use colloquy_types::config::SessionConfig;
use colloquy_types::error::{PreconditionError, SessionError};
use colloquy_types::message::{ControlToken, OutboundMessage, PromptPayload};
use colloquy_types::snapshot::SessionSnapshot;
use colloquy_types::turn::Turn;

use crate::accumulator::SessionUpdate;
use crate::channel::{Channel, ChannelOutcome};
use crate::event::SnapshotBus;
use crate::transport::{SessionEvent, Transport};

/// Maximum channels bound to one session (dual-agent debate).
pub const MAX_CHANNELS: usize = 2;

pub struct SessionCoordinator<T: Transport> {
    transport: T,
    channels: Vec<Channel>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    bus: SnapshotBus,
    /// A submit (or auto-start) has been accepted at least once.
    submitted: bool,
}

impl<T: Transport> SessionCoordinator<T> {
    /// Build a session over the configured channels. Nothing connects until
    /// [`open`](Self::open).
    pub fn new(config: SessionConfig, transport: T) -> Result<Self, SessionError> {
        let count = config.channels.len();
        if count == 0 || count > MAX_CHANNELS {
            return Err(SessionError::ChannelCount(count));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let channels = config
            .channels
            .into_iter()
            .enumerate()
            .map(|(i, channel)| {
                Channel::new(
                    ChannelId(i),
                    channel,
                    &config.protocol,
                    config.reconnect.clone(),
                    events_tx.clone(),
                )
            })
            .collect();

        Ok(Self {
            transport,
            channels,
            events_rx,
            bus: SnapshotBus::default(),
            submitted: false,
        })
    }

    /// Start connecting every channel.
    pub fn open(&mut self) {
        for channel in &mut self.channels {
            channel.open(&self.transport);
        }
        self.publish();
    }

    /// Submit a prompt to every channel.
    ///
    /// Rejected without any side effect unless every channel is open; the
    /// caller should re-check `connected` before retrying.
    pub fn submit(&mut self, prompt: PromptPayload) -> Result<(), PreconditionError> {
        self.ensure_connected("submit")?;

        let message = OutboundMessage::Prompt(prompt);
        for channel in &mut self.channels {
            channel.begin_exchange();
        }
        self.submitted = true;
        self.fan_out(&message);
        self.publish();
        Ok(())
    }

    /// Send a control token (e.g. `next` for one more debate turn) to every
    /// channel, keeping the turns accumulated so far.
    pub fn advance(&mut self, token: ControlToken) -> Result<(), PreconditionError> {
        self.ensure_connected(token.as_str())?;

        let message = OutboundMessage::Control(token);
        for channel in &mut self.channels {
            channel.resume_exchange();
        }
        self.submitted = true;
        self.fan_out(&message);
        self.publish();
        Ok(())
    }

    /// Process one event to completion and publish the resulting snapshot.
    pub fn handle(&mut self, event: SessionEvent) {
        let index = event.channel.0;
        let Some(channel) = self.channels.get_mut(index) else {
            tracing::warn!(channel = %event.channel, "event for unknown channel");
            return;
        };

        let outcome = channel.handle(event, &self.transport);
        match outcome {
            ChannelOutcome::Ignored => return,
            ChannelOutcome::Opened => self.after_open(index),
            ChannelOutcome::Updated(updates) => self.after_updates(index, &updates),
            ChannelOutcome::Confirmed
            | ChannelOutcome::Closed(_)
            | ChannelOutcome::Reconnecting => {}
        }
        self.publish();
    }

    /// Wait for the next queued event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Wait for and process one event.
    pub async fn step(&mut self) {
        if let Some(event) = self.next_event().await {
            self.handle(event);
        }
    }

    /// Process every event that is already queued, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            processed += 1;
        }
        processed
    }

    /// Drive the session until every channel is open (`true`) or some
    /// channel gave up reconnecting (`false`).
    pub async fn wait_until_connected(&mut self) -> bool {
        loop {
            if self.all_connected() {
                return true;
            }
            if self.disconnected() {
                return false;
            }
            self.step().await;
        }
    }

    /// Drive the session until no channel is loading: each one reached its
    /// sentinel, lost its exchange to a dropped connection, or gave up.
    pub async fn run_until_settled(&mut self) -> SessionSnapshot {
        while self.loading() && !self.disconnected() {
            self.step().await;
        }
        self.snapshot()
    }

    /// Close every channel and cancel pending reconnects.
    pub fn close(&mut self) {
        for channel in &mut self.channels {
            channel.close();
        }
        self.publish();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            channels: self.channels.iter().map(Channel::snapshot).collect(),
            connected: self.connected(),
            loading: self.loading(),
            done: self.done(),
            interrupted: self.interrupted(),
            disconnected: self.disconnected(),
        }
    }

    /// Receiver of the latest snapshot; intermediate ones may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.bus.subscribe()
    }

    /// True while any channel still waits for its sentinel.
    pub fn loading(&self) -> bool {
        self.channels.iter().any(Channel::loading)
    }

    pub fn done(&self) -> bool {
        self.submitted && !self.loading() && !self.interrupted()
    }

    /// True when some channel's current exchange ended without a sentinel.
    pub fn interrupted(&self) -> bool {
        self.channels.iter().any(Channel::interrupted)
    }

    pub fn connected(&self) -> Vec<bool> {
        self.channels.iter().map(Channel::is_open).collect()
    }

    pub fn all_connected(&self) -> bool {
        self.channels.iter().all(Channel::is_open)
    }

    /// True once any channel exhausted its reconnect budget.
    pub fn disconnected(&self) -> bool {
        self.channels.iter().any(Channel::is_failed)
    }

    pub fn turns(&self) -> Vec<Vec<Turn>> {
        self.channels.iter().map(|c| c.turns().to_vec()).collect()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn ensure_connected(&self, action: &str) -> Result<(), PreconditionError> {
        if let Some(channel) = self.channels.iter().find(|c| !c.is_open()) {
            let err = PreconditionError::NotConnected {
                channel: channel.id(),
                state: channel.state(),
            };
            tracing::warn!(action, "rejected: {err}");
            return Err(err);
        }
        Ok(())
    }

    fn fan_out(&self, message: &OutboundMessage) {
        for channel in &self.channels {
            if let Err(err) = channel.send(message) {
                // The transport reports the closure that follows; the
                // lifecycle takes it from there.
                tracing::warn!(channel = %channel.id(), error = %err, "send failed");
            }
        }
    }

    fn after_open(&mut self, index: usize) {
        let channel = &mut self.channels[index];
        if !channel.config().auto_start {
            return;
        }
        channel.resume_exchange();
        self.submitted = true;
        if let Err(err) = channel.send(&OutboundMessage::Control(ControlToken::Start)) {
            tracing::warn!(channel = %channel.id(), error = %err, "auto-start failed");
        }
    }

    fn after_updates(&mut self, index: usize, updates: &[SessionUpdate]) {
        let completed = updates
            .iter()
            .any(|u| matches!(u, SessionUpdate::Completed { .. }));
        if !completed {
            return;
        }

        let channel = &mut self.channels[index];
        tracing::debug!(channel = %channel.id(), "generation complete");
        if channel.config().auto_continue && channel.is_open() {
            channel.resume_exchange();
            if let Err(err) = channel.send(&OutboundMessage::Control(ControlToken::Continue)) {
                tracing::warn!(channel = %channel.id(), error = %err, "auto-continue failed");
            }
        }
    }

    fn publish(&self) {
        self.bus.publish(self.snapshot());
    }
}

impl<T: Transport> Drop for SessionCoordinator<T> {
    fn drop(&mut self) {
        for channel in &mut self.channels {
            channel.close();
        }
    }
}

impl<T: Transport> std::fmt::Debug for SessionCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("channels", &self.channels)
            .field("submitted", &self.submitted)
            .finish()
    }
}
