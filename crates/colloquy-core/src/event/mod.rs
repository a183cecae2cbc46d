//! Snapshot distribution to presentation layers.

pub mod bus;

pub use bus::SnapshotBus;
