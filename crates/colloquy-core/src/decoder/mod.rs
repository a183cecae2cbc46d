//! Frame decoder: raw transport input to ordered [`Frame`]s.
//!
//! Two modes, selected by transport:
//! - **Message**: each inbound message is one raw payload.
//! - **Stream**: chunks are line-split with a residual buffer (see
//!   [`LineSplitter`]) and prefixed lines yield payloads.
//!
//! Every payload then goes through the [`FrameClassifier`].

pub mod classify;
pub mod line;

pub use classify::FrameClassifier;
pub use line::LineSplitter;

use colloquy_types::config::{ProtocolConfig, TransportKind};
use colloquy_types::error::FrameParseError;
use colloquy_types::frame::{Frame, RawInput, SentinelKind};

/// Decoding mode for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    Message,
    Stream,
}

impl From<TransportKind> for DecodeMode {
    fn from(kind: TransportKind) -> Self {
        if kind.is_stream() {
            DecodeMode::Stream
        } else {
            DecodeMode::Message
        }
    }
}

/// Per-channel frame decoder.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    mode: DecodeMode,
    classifier: FrameClassifier,
    splitter: LineSplitter,
}

impl FrameDecoder {
    pub fn new(mode: DecodeMode, protocol: &ProtocolConfig) -> Self {
        Self {
            mode,
            classifier: FrameClassifier::new(protocol),
            splitter: LineSplitter::new(protocol.data_prefix.clone()),
        }
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Decode one raw input into zero or more frames, in arrival order.
    pub fn decode(&mut self, input: RawInput) -> Vec<Frame> {
        match input {
            RawInput::Text(text) => match self.mode {
                DecodeMode::Message => vec![self.classifier.classify(&text)],
                DecodeMode::Stream => self.decode_chunk(text.as_bytes()),
            },
            RawInput::Binary(bytes) => match self.mode {
                DecodeMode::Message => match String::from_utf8(bytes) {
                    Ok(text) => vec![self.classifier.classify(&text)],
                    Err(_) => {
                        tracing::debug!("dropping binary message that is not UTF-8");
                        vec![Frame::Malformed {
                            reason: "binary message is not valid UTF-8".to_string(),
                        }]
                    }
                },
                DecodeMode::Stream => self.decode_chunk(&bytes),
            },
            RawInput::Chunk(bytes) => self.decode_chunk(&bytes),
            RawInput::EndOfStream => {
                let mut frames = Vec::new();
                if let Some(last) = self.splitter.finish() {
                    frames.push(self.classify_line(last));
                }
                frames.push(Frame::Sentinel {
                    kind: SentinelKind::EndOfStream,
                });
                frames
            }
        }
    }

    /// Forget any buffered partial line (new request, new stream).
    pub fn reset(&mut self) {
        self.splitter.reset();
    }

    /// Bytes held back waiting for a line terminator.
    pub fn residual_len(&self) -> usize {
        self.splitter.residual().len()
    }

    fn decode_chunk(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.splitter
            .push(chunk)
            .into_iter()
            .map(|line| self.classify_line(line))
            .collect()
    }

    fn classify_line(&self, line: Result<String, FrameParseError>) -> Frame {
        match line {
            Ok(payload) => self.classifier.classify(&payload),
            Err(err) => {
                tracing::debug!(error = %err, "dropping malformed stream line");
                Frame::Malformed {
                    reason: err.to_string(),
                }
            }
        }
    }
}
