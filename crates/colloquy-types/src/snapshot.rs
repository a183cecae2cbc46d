//! Immutable session snapshots published to presentation layers.

use serde::{Deserialize, Serialize};

use crate::channel::ConnectionState;
use crate::turn::Turn;

/// State of one channel at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub endpoint: String,
    pub state: ConnectionState,
    pub turns: Vec<Turn>,
    /// True until this channel sees a sentinel after the last submit.
    pub loading: bool,
    /// The connection dropped before the sentinel; the turns are partial.
    pub interrupted: bool,
    /// True once automatic reconnects are exhausted.
    pub failed: bool,
}

/// State of the whole session at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub channels: Vec<ChannelSnapshot>,
    /// Per-channel connectivity, in channel order.
    pub connected: Vec<bool>,
    /// True while any channel is still waiting for its sentinel.
    pub loading: bool,
    /// True once a submit was accepted and every channel reached its sentinel.
    pub done: bool,
    /// True when some channel lost its connection mid-exchange. The exchange
    /// will not complete; `done` stays false.
    pub interrupted: bool,
    /// True when some channel gave up reconnecting.
    pub disconnected: bool,
}

impl SessionSnapshot {
    /// Turn lists, one per channel.
    pub fn turns(&self) -> Vec<Vec<Turn>> {
        self.channels.iter().map(|c| c.turns.clone()).collect()
    }

    pub fn all_connected(&self) -> bool {
        !self.connected.is_empty() && self.connected.iter().all(|c| *c)
    }
}
