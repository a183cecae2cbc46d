//! Connection lifecycle state machine with a bounded reconnect policy.
//!
//! ```text
//!            open()                  handshake ok
//!   ──────────────────► Connecting ───────────────► Open
//!                           │                        │
//!          handshake failed │                        │ unexpected close
//!                           ▼                        ▼
//!                         Failed                   Closed
//!                           │                        │
//!                           └── closures < bound? ───┘
//!                                 yes: schedule reconnect after `delay`
//!                                 no:  stay put, report failure
//! ```
//!
//! Every unexpected closure (a refused handshake included) bumps the
//! counter; a reconnect is scheduled only while the counter is below
//! `max_retries`. With the default bound of 3 the third consecutive
//! closure is final. The counter resets only on a *confirmed* open.
//!
//! Some transports accept sends before the backend has answered anything
//! (streaming HTTP only learns the status with the first request). Those
//! report [`on_ready`](ChannelLifecycle::on_ready): the channel is `Open`
//! but the counter is kept until [`on_open`](ChannelLifecycle::on_open)
//! confirms the handshake.
//!
//! A failed reconnect attempt lands in `Closed`; only the very first attempt
//! after `open()` can land in `Failed`. The state machine never touches
//! timers or sockets: it tells the caller what to do via [`CloseOutcome`].

use std::time::Duration;

use colloquy_types::channel::ConnectionState;
use colloquy_types::config::ReconnectConfig;

/// What the caller should do after a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Schedule reconnect attempt number `attempt` after `delay`.
    Reconnect { attempt: u32, delay: Duration },
    /// The retry budget is spent; surface the failure.
    GaveUp { attempts: u32 },
    /// Stale or suppressed event; nothing to do.
    Ignored,
}

/// What the caller should do after a handshake event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// `Connecting -> Open`.
    Opened,
    /// An already usable link was confirmed by the backend.
    Confirmed,
    /// Stale or suppressed event.
    Ignored,
}

/// Lifecycle of one channel's connection.
#[derive(Debug, Clone)]
pub struct ChannelLifecycle {
    state: ConnectionState,
    retries: u32,
    max_retries: u32,
    delay: Duration,
    /// The current connection attempt came from a scheduled reconnect.
    reconnecting: bool,
    reconnect_pending: bool,
    /// The backend has answered on the current link.
    confirmed: bool,
    /// Set by `close()`; suppresses every automatic transition.
    manually_closed: bool,
    failed: bool,
}

impl ChannelLifecycle {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Closed,
            retries: 0,
            max_retries: config.max_retries,
            delay: config.delay(),
            reconnecting: false,
            reconnect_pending: false,
            confirmed: false,
            manually_closed: false,
            failed: false,
        }
    }

    /// Begin an explicit `open()`.
    pub fn begin_open(&mut self) {
        self.state = ConnectionState::Connecting;
        self.retries = 0;
        self.reconnecting = false;
        self.reconnect_pending = false;
        self.confirmed = false;
        self.manually_closed = false;
        self.failed = false;
    }

    /// The link accepts sends, but the backend has not answered yet.
    /// Returns `false` if the event is stale.
    pub fn on_ready(&mut self) -> bool {
        if self.manually_closed || self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Open;
        self.reconnecting = false;
        self.confirmed = false;
        true
    }

    /// Handshake succeeded; the retry counter resets.
    pub fn on_open(&mut self) -> OpenOutcome {
        if self.manually_closed {
            return OpenOutcome::Ignored;
        }
        let outcome = match self.state {
            ConnectionState::Connecting => OpenOutcome::Opened,
            ConnectionState::Open if !self.confirmed => OpenOutcome::Confirmed,
            _ => return OpenOutcome::Ignored,
        };
        self.state = ConnectionState::Open;
        self.retries = 0;
        self.reconnecting = false;
        self.confirmed = true;
        self.failed = false;
        outcome
    }

    /// The connection closed (or the handshake failed) without `close()`.
    pub fn on_close(&mut self) -> CloseOutcome {
        if self.manually_closed {
            return CloseOutcome::Ignored;
        }
        match self.state {
            ConnectionState::Connecting if !self.reconnecting => {
                self.state = ConnectionState::Failed;
            }
            ConnectionState::Connecting | ConnectionState::Open => {
                self.state = ConnectionState::Closed;
            }
            // Already down; a second close for the same link.
            ConnectionState::Closed | ConnectionState::Failed => return CloseOutcome::Ignored,
        }
        self.confirmed = false;
        self.retries += 1;
        self.schedule_or_give_up()
    }

    /// A scheduled reconnect fired. Returns `true` if the caller should
    /// start a new connection attempt.
    pub fn on_reconnect_due(&mut self) -> bool {
        if self.manually_closed || !self.reconnect_pending {
            return false;
        }
        self.reconnect_pending = false;
        self.reconnecting = true;
        self.state = ConnectionState::Connecting;
        true
    }

    /// Consumer-initiated teardown. Cancels any pending reconnect.
    pub fn close(&mut self) {
        self.manually_closed = true;
        self.reconnect_pending = false;
        self.reconnecting = false;
        self.state = ConnectionState::Closed;
    }

    fn schedule_or_give_up(&mut self) -> CloseOutcome {
        if self.retries < self.max_retries {
            self.reconnect_pending = true;
            CloseOutcome::Reconnect {
                attempt: self.retries,
                delay: self.delay,
            }
        } else {
            self.failed = true;
            self.reconnecting = false;
            CloseOutcome::GaveUp {
                attempts: self.retries,
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn is_manually_closed(&self) -> bool {
        self.manually_closed
    }
}
