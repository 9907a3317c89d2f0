//! Hand-off from the watcher task to presentation consumers.

use queuetimer_protocol::{QueueSession, StateSnapshot};
use tokio::sync::watch;

/// Callback invoked with every finalized session.
///
/// Runs on the watcher task between polls, so it must not block; hand slow
/// work such as file I/O off to another task.
pub type OnSessionFn = Box<dyn Fn(QueueSession) + Send + Sync + 'static>;

/// Receiving side: always holds the most recent snapshot.
pub type SnapshotReceiver = watch::Receiver<StateSnapshot>;

/// Publishes state snapshots with replace-latest semantics.
///
/// Publishing never blocks and never fails, even with no receivers left.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<StateSnapshot>,
}

impl SnapshotPublisher {
    /// Creates a publisher seeded with `initial`.
    pub fn new(initial: StateSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the current snapshot if the state or last map changed.
    ///
    /// Returns `true` when receivers were notified. A snapshot that differs
    /// only in its timestamp is not a change.
    pub fn publish(&self, snapshot: StateSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if current.state == snapshot.state && current.last_map == snapshot.last_map {
                return false;
            }
            *current = snapshot;
            true
        })
    }

    /// Returns a new receiver positioned at the current snapshot.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    /// Copy of the current snapshot.
    pub fn latest(&self) -> StateSnapshot {
        self.tx.borrow().clone()
    }
}
