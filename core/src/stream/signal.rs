use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

/// Auto-reset event: `set` wakes at most one waiter, extra sets coalesce.
///
/// Waits are always bounded; a missed wake-up costs one idle period, never a hang.
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    pub fn set(&self) {
        let _ = self.tx.try_send(());
    }

    /// True if the signal fired within `timeout`.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
