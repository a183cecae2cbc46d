//! Span names shared by Colloquy binaries.
//!
//! Session fields use the same keys everywhere: `channel` (`ch0`, `ch1`),
//! `endpoint`, `state` and `attempt`.

/// One full session run, from open until it settles.
pub const SPAN_SESSION: &str = "colloquy.session";

/// One submitted prompt or control token, until done or disconnected.
pub const SPAN_EXCHANGE: &str = "colloquy.exchange";
