//! Logging and trace export setup for Colloquy binaries.

pub mod attrs;
pub mod tracing_setup;
