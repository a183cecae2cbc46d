//! Shared domain types for Colloquy.
//!
//! This crate contains the types used across the streaming session client:
//! frames, turns, channel state, outbound messages, snapshots, configuration
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod message;
pub mod snapshot;
pub mod turn;
