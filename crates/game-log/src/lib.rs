//! Console log watcher: tail the game's `console.log`, classify lines into
//! queue events, and track the matchmaking queue lifecycle.
//!
//! The [`QueueWatcher`] runs on a background tokio task. Presentation code
//! only ever sees [`StateSnapshot`](queuetimer_protocol::StateSnapshot)s
//! through a watch channel, and finished sessions through a callback.

mod classify;
mod machine;
mod notify;
mod pipeline;
mod source;
mod watcher;

pub use classify::{DomainEvent, classify};
pub use machine::{MaplessPolicy, QueueMachine};
pub use notify::{OnSessionFn, SnapshotPublisher, SnapshotReceiver};
pub use pipeline::Pipeline;
pub use source::{FileIdentity, LineSource, LogCursor};
pub use watcher::{QueueWatcher, WatcherConfig};
