//! Latest-value bus for [`SessionSnapshot`]s.
//!
//! Every snapshot is complete on its own, so subscribers only ever need the
//! newest one. The bus sits on `tokio::sync::watch`: a slow subscriber skips
//! straight to the current snapshot instead of lagging, and publishing a
//! snapshot equal to the current one wakes nobody.

use colloquy_types::snapshot::SessionSnapshot;
use tokio::sync::watch;

pub struct SnapshotBus {
    sender: watch::Sender<SessionSnapshot>,
}

impl Default for SnapshotBus {
    fn default() -> Self {
        let (sender, _) = watch::channel(SessionSnapshot::default());
        Self { sender }
    }
}

impl SnapshotBus {
    /// New subscriber. The current snapshot counts as already seen.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.sender.subscribe()
    }

    /// Replace the current snapshot. Returns `true` if it changed.
    pub fn publish(&self, snapshot: SessionSnapshot) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }
}
