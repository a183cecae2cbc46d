use thiserror::Error;

use crate::channel::{ChannelId, ConnectionState};

/// Errors from opening, using or keeping a backend connection.
///
/// Recovered by the bounded reconnect policy; only surfaced to the session
/// once the retry budget is spent.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("handshake with '{endpoint}' failed: {reason}")]
    Handshake { endpoint: String, reason: String },

    #[error("socket error: {0}")]
    Socket(String),

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    #[error("channel is {state}, not open")]
    NotOpen { state: ConnectionState },

    #[error("gave up on '{endpoint}' after {attempts} consecutive failures")]
    RetriesExhausted { endpoint: String, attempts: u32 },
}

/// Errors from classifying a raw payload. Always recovered locally: the
/// payload becomes a `Frame::Malformed` and is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("structured payload is not a JSON object")]
    NotAnObject,

    #[error("structured payload has no '{0}' field")]
    MissingField(&'static str),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
}

/// A submit was attempted while the session was not fully connected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("channel {channel} is {state}; every channel must be open")]
    NotConnected {
        channel: ChannelId,
        state: ConnectionState,
    },
}

/// Errors from building or driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a session binds one or two channels, got {0}")]
    ChannelCount(usize),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
