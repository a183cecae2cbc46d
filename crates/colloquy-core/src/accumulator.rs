//! Turn accumulator: merges content frames into speaker runs.
//!
//! A pure reducer over one channel's turn list. The last turn is the only
//! open (mutable) one; a frame from a different speaker freezes it and opens
//! a new one. Sentinels only clear the `loading` flag, so whatever partial
//! text the backend produced (trailing newlines included) stays visible.
//!
//! An exchange whose connection drops before its sentinel is *interrupted*:
//! `loading` clears, the partial turns stay, and the flag is kept until the
//! next exchange starts.

use colloquy_types::frame::{Frame, SentinelKind};
use colloquy_types::turn::Turn;

/// What a single `ingest` call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A new turn was opened at `index`.
    TurnOpened { index: usize },
    /// The open turn at `index` grew.
    TurnExtended { index: usize },
    /// The generation ended; `loading` is now false.
    Completed { kind: SentinelKind },
    /// Nothing changed.
    Ignored,
}

/// Per-channel turn list plus its loading flag.
#[derive(Debug, Clone, Default)]
pub struct TurnAccumulator {
    turns: Vec<Turn>,
    loading: bool,
    interrupted: bool,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame.
    pub fn ingest(&mut self, frame: Frame) -> SessionUpdate {
        match frame {
            Frame::Content { speaker, text } => {
                let same_speaker = self
                    .turns
                    .last()
                    .is_some_and(|open| open.speaker == speaker);
                if same_speaker {
                    let index = self.turns.len() - 1;
                    self.turns[index].text.push_str(&text);
                    SessionUpdate::TurnExtended { index }
                } else {
                    self.turns.push(Turn { speaker, text });
                    SessionUpdate::TurnOpened {
                        index: self.turns.len() - 1,
                    }
                }
            }
            Frame::Sentinel { kind } => {
                self.loading = false;
                SessionUpdate::Completed { kind }
            }
            Frame::Malformed { .. } => SessionUpdate::Ignored,
        }
    }

    /// Start a fresh exchange: clear turns and wait for a sentinel.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.loading = true;
        self.interrupted = false;
    }

    /// Wait for another sentinel without clearing earlier turns.
    pub fn resume(&mut self) {
        self.loading = true;
        self.interrupted = false;
    }

    /// The connection carrying the exchange went away. Returns `true` if an
    /// exchange was in progress.
    pub fn interrupt(&mut self) -> bool {
        if !self.loading {
            return false;
        }
        self.loading = false;
        self.interrupted = true;
        true
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}
