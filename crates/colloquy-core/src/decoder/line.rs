//! Line splitter for the chunked stream sub-protocol.
//!
//! Network chunks arrive with arbitrary boundaries. The splitter keeps the
//! last incomplete line as a residual buffer and hands out payloads from
//! complete lines that carry the configured field prefix:
//!
//! ```text
//! chunk 1: "data: foo\nda"   -> payload "foo", residual "da"
//! chunk 2: "ta: bar\n"       -> payload "bar", residual ""
//! ```
//!
//! Splitting happens on bytes, so a multi-byte UTF-8 character cut in half by
//! a chunk boundary is reassembled before the line is decoded.

use colloquy_types::error::FrameParseError;

/// Residual-buffered line splitter.
#[derive(Debug, Clone)]
pub struct LineSplitter {
    prefix: String,
    residual: Vec<u8>,
}

impl LineSplitter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            residual: Vec::new(),
        }
    }

    /// Feed one chunk; return the payloads of every completed prefixed line.
    ///
    /// Non-prefixed lines (blank separators, comments, other SSE fields) are
    /// dropped. Lines that are not valid UTF-8 come back as errors so the
    /// caller can log them as malformed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, FrameParseError>> {
        self.residual.extend_from_slice(chunk);

        let Some(last_newline) = self.residual.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.residual.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.residual, rest);

        complete
            .split(|b| *b == b'\n')
            .filter_map(|line| self.extract(line))
            .collect()
    }

    /// Flush the residual as a final line at end of stream.
    pub fn finish(&mut self) -> Option<Result<String, FrameParseError>> {
        let line = std::mem::take(&mut self.residual);
        if line.is_empty() {
            return None;
        }
        self.extract(&line)
    }

    /// Drop any buffered partial line.
    pub fn reset(&mut self) {
        self.residual.clear();
    }

    /// Bytes currently held back waiting for a newline.
    pub fn residual(&self) -> &[u8] {
        &self.residual
    }

    fn extract(&self, line: &[u8]) -> Option<Result<String, FrameParseError>> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let payload = line.strip_prefix(self.prefix.as_bytes())?;
        Some(
            std::str::from_utf8(payload)
                .map(str::to_string)
                .map_err(|_| FrameParseError::InvalidUtf8),
        )
    }
}
