//! Frame types for the streaming session protocol.
//!
//! A [`Frame`] is one decoded unit of backend output. Transports hand the
//! decoder [`RawInput`] values; the decoder turns them into frames.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelKind {
    /// The backend sent one of the configured sentinel literals.
    Done,
    /// A streaming HTTP body ended without a sentinel literal.
    EndOfStream,
}

impl fmt::Display for SentinelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelKind::Done => write!(f, "done"),
            SentinelKind::EndOfStream => write!(f, "end_of_stream"),
        }
    }
}

/// One decoded unit of backend output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Literal output text, optionally attributed to a speaker.
    Content {
        #[serde(skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
        text: String,
    },

    /// End-of-generation marker.
    Sentinel { kind: SentinelKind },

    /// A payload that failed structural parsing. Dropped by the accumulator.
    Malformed { reason: String },
}

impl Frame {
    /// Shorthand for a content frame.
    pub fn content(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Frame::Content {
            speaker: speaker.map(str::to_string),
            text: text.into(),
        }
    }

    /// Shorthand for the literal-sentinel frame.
    pub fn done() -> Self {
        Frame::Sentinel {
            kind: SentinelKind::Done,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Frame::Sentinel { .. })
    }
}

/// Raw input handed from a transport to the frame decoder.
///
/// Message-oriented transports (WebSocket) produce `Text`/`Binary`, one per
/// logical unit. Byte-stream transports (chunked HTTP) produce `Chunk`s with
/// arbitrary boundaries, followed by `EndOfStream` when the body ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Binary(Vec<u8>),
    Chunk(Vec<u8>),
    EndOfStream,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_frame_serializes_without_missing_speaker() {
        let frame = Frame::content(None, "hello");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"content","text":"hello"}"#);
    }

    #[test]
    fn sentinel_frame_serializes_kind() {
        let json = serde_json::to_string(&Frame::done()).unwrap();
        assert_eq!(json, r#"{"type":"sentinel","kind":"done"}"#);
        assert!(Frame::done().is_sentinel());
    }

    #[test]
    fn sentinel_kind_display() {
        assert_eq!(SentinelKind::Done.to_string(), "done");
        assert_eq!(SentinelKind::EndOfStream.to_string(), "end_of_stream");
    }
}
