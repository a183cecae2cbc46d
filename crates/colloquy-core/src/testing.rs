//! In-memory transport for coordinator and channel tests.
//!
//! Records every connection attempt's [`EventSink`] so tests can play the
//! backend: `transport.sink(ChannelId(0)).opened()` completes a handshake,
//! `.frame(..)` delivers data, `.closed(false)` drops the connection.

use std::sync::{Arc, Mutex};

use colloquy_types::channel::ChannelId;
use colloquy_types::config::{ChannelConfig, ReconnectConfig};
use colloquy_types::error::ConnectionError;
use colloquy_types::frame::RawInput;
use colloquy_types::message::OutboundMessage;

use crate::transport::{EventSink, Link, Transport};

#[derive(Default)]
struct MockState {
    attempts: Vec<EventSink>,
    sent: Vec<(ChannelId, OutboundMessage)>,
    closed_links: usize,
    refuse_open: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `open` fail synchronously.
    pub fn refuse_open(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_open = refuse;
    }

    /// Sink of the latest connection attempt on `channel`.
    pub fn sink(&self, channel: ChannelId) -> EventSink {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .rev()
            .find(|s| s.channel() == channel)
            .cloned()
            .expect("no connection attempt on channel")
    }

    pub fn attempts(&self, channel: ChannelId) -> usize {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|s| s.channel() == channel)
            .count()
    }

    pub fn sent(&self, channel: ChannelId) -> Vec<OutboundMessage> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn closed_links(&self) -> usize {
        self.state.lock().unwrap().closed_links
    }

    pub fn text(&self, channel: ChannelId, text: &str) {
        self.sink(channel).frame(RawInput::Text(text.to_string()));
    }
}

impl Transport for MockTransport {
    fn open(
        &self,
        channel: &ChannelConfig,
        _reconnect: &ReconnectConfig,
        sink: EventSink,
    ) -> Result<Box<dyn Link>, ConnectionError> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(sink.clone());
        if state.refuse_open {
            return Err(ConnectionError::Handshake {
                endpoint: channel.endpoint.clone(),
                reason: "refused by mock".to_string(),
            });
        }
        Ok(Box::new(MockLink {
            channel: sink.channel(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockLink {
    channel: ChannelId,
    state: Arc<Mutex<MockState>>,
}

impl Link for MockLink {
    fn send(&self, message: &OutboundMessage) -> Result<(), ConnectionError> {
        self.state
            .lock()
            .unwrap()
            .sent
            .push((self.channel, message.clone()));
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed_links += 1;
    }
}
