//! Infrastructure layer for Colloquy.
//!
//! Implements the [`colloquy_core::transport::Transport`] port over the
//! network (WebSocket and streaming HTTP) and loads session configuration
//! from TOML files.

pub mod config;
pub mod transport;

pub use transport::NetworkTransport;
