//! Session logic for Colloquy.
//!
//! This crate holds the protocol state machines: frame decoding, turn
//! accumulation, the per-channel connection lifecycle and the session
//! coordinator. It defines the [`transport::Transport`] port that
//! `colloquy-infra` implements and never performs network I/O itself.

pub mod accumulator;
pub mod channel;
pub mod coordinator;
pub mod decoder;
pub mod event;
pub mod lifecycle;
pub mod transport;

#[cfg(test)]
mod testing;

pub use coordinator::SessionCoordinator;
