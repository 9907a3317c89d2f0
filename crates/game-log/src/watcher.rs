//! Background polling of the console log.
//!
//! One tokio task per running watcher owns the [`Pipeline`]. Presentation
//! code subscribes to snapshots and never touches the pipeline directly.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use queuetimer_protocol::StateSnapshot;
use queuetimer_protocol::constants::{
    DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::machine::{MaplessPolicy, QueueMachine};
use crate::notify::{OnSessionFn, SnapshotPublisher, SnapshotReceiver};
use crate::pipeline::Pipeline;
use crate::source::LineSource;

/// Settings for a [`QueueWatcher`].
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Log file to tail.
    pub log_path: PathBuf,
    /// Time between polls. Zero selects the default; otherwise clamped.
    pub poll_interval: Duration,
    /// How long an ended session waits for its map.
    pub grace_period: Duration,
    /// What happens to sessions that never get a map.
    pub mapless: MaplessPolicy,
    /// Skip content already in the log when the watcher starts.
    pub start_at_end: bool,
}

impl WatcherConfig {
    /// Default settings for the given log file.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            mapless: MaplessPolicy::default(),
            start_at_end: false,
        }
    }

    fn effective_interval(&self) -> Duration {
        if self.poll_interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.poll_interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
        }
    }
}

/// Requests sent to the running task.
#[derive(Debug)]
enum Command {
    Reset,
}

/// Tails the console log on a background task and tracks the queue.
pub struct QueueWatcher {
    inner: Arc<Mutex<WatcherState>>,
    publisher: Arc<SnapshotPublisher>,
}

struct WatcherState {
    config: WatcherConfig,
    on_session: Arc<OnSessionFn>,
    task: Option<RunningTask>,
}

struct RunningTask {
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl Drop for RunningTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl QueueWatcher {
    /// Creates a stopped watcher. `on_session` receives finalized sessions.
    pub fn new(config: WatcherConfig, on_session: OnSessionFn) -> Self {
        Self {
            inner: Arc::new(Mutex::new(WatcherState {
                config,
                on_session: Arc::new(on_session),
                task: None,
            })),
            publisher: Arc::new(SnapshotPublisher::new(StateSnapshot::idle(Utc::now()))),
        }
    }

    /// Returns a receiver for state snapshots.
    pub fn subscribe(&self) -> SnapshotReceiver {
        self.publisher.subscribe()
    }

    /// Starts polling with a fresh idle state.
    ///
    /// Idempotent: does nothing if already running.
    pub async fn start(&self) {
        let mut state = self.inner.lock().await;
        if state.task.is_some() {
            return;
        }

        let config = &state.config;
        let interval = config.effective_interval();
        let source = if config.start_at_end {
            LineSource::from_end(&config.log_path)
        } else {
            LineSource::new(&config.log_path)
        };
        let machine = QueueMachine::new(config.grace_period, config.mapless);
        let pipeline = Pipeline::new(source, machine);

        let now = Utc::now();
        self.publisher.publish(pipeline.machine().snapshot(now));

        let cancel = CancellationToken::new();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(watch_loop(
            pipeline,
            interval,
            Arc::clone(&self.publisher),
            Arc::clone(&state.on_session),
            command_rx,
            cancel.clone(),
        ));

        tracing::info!(
            path = %state.config.log_path.display(),
            interval_ms = interval.as_millis() as u64,
            "queue watcher started"
        );

        state.task = Some(RunningTask {
            cancel,
            commands,
            handle,
        });
    }

    /// Stops polling and waits for the background task to exit.
    pub async fn stop(&self) {
        let task = self.inner.lock().await.task.take();
        let Some(mut task) = task else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = (&mut task.handle).await {
            tracing::warn!(error = %e, "queue watcher task ended abnormally");
        }
        tracing::info!("queue watcher stopped");
    }

    /// Returns `true` if the background task is running.
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.task.is_some()
    }

    /// Drops the current session and returns to idle.
    pub async fn reset(&self) {
        let state = self.inner.lock().await;
        match &state.task {
            Some(task) => {
                let _ = task.commands.send(Command::Reset);
            }
            None => {
                self.publisher.publish(StateSnapshot::idle(Utc::now()));
            }
        }
    }
}

/// Main polling loop.
async fn watch_loop(
    mut pipeline: Pipeline,
    interval: Duration,
    publisher: Arc<SnapshotPublisher>,
    on_session: Arc<OnSessionFn>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            Some(command) = commands.recv() => match command {
                Command::Reset => {
                    pipeline.reset();
                    publisher.publish(pipeline.machine().snapshot(Utc::now()));
                    tracing::info!("queue timer reset");
                }
            },
            _ = ticker.tick() => {
                let now = Utc::now();
                for session in pipeline.poll(now) {
                    tracing::info!(
                        started_at = %session.started_at,
                        queue_secs = session.queue_time().map(|d| d.as_secs_f64()),
                        map = session.map.as_deref().unwrap_or("-"),
                        "queue session finished"
                    );
                    (on_session)(session);
                }
                if publisher.publish(pipeline.machine().snapshot(now)) {
                    tracing::debug!(state = pipeline.machine().state().label(), "queue state changed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_defaults_and_clamps() {
        let mut config = WatcherConfig::new("console.log");
        config.poll_interval = Duration::ZERO;
        assert_eq!(config.effective_interval(), DEFAULT_POLL_INTERVAL);

        config.poll_interval = Duration::from_millis(1);
        assert_eq!(config.effective_interval(), MIN_POLL_INTERVAL);

        config.poll_interval = Duration::from_secs(60);
        assert_eq!(config.effective_interval(), MAX_POLL_INTERVAL);

        config.poll_interval = Duration::from_millis(250);
        assert_eq!(config.effective_interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn watcher_start_stop() {
        let tmp = tempfile::tempdir().unwrap();
        let watcher = QueueWatcher::new(
            WatcherConfig::new(tmp.path().join("console.log")),
            Box::new(|_| {}),
        );
        assert!(!watcher.is_running().await);

        watcher.start().await;
        watcher.start().await;
        assert!(watcher.is_running().await);

        watcher.stop().await;
        assert!(!watcher.is_running().await);

        // Stopping twice is harmless.
        watcher.stop().await;
    }

    #[tokio::test]
    async fn reset_while_stopped_publishes_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let watcher = QueueWatcher::new(
            WatcherConfig::new(tmp.path().join("console.log")),
            Box::new(|_| {}),
        );
        let rx = watcher.subscribe();
        watcher.reset().await;
        assert!(!rx.borrow().state.is_waiting());
    }
}
