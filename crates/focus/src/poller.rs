//! Async focus poller with configurable interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::FocusProbe;

/// Receiving side of the focus channel: `true` while the game has focus.
pub type FocusReceiver = watch::Receiver<bool>;

/// Polls a [`FocusProbe`] on a tokio task and publishes changes.
pub struct FocusPoller {
    inner: Arc<Mutex<PollerState>>,
    tx: Arc<watch::Sender<bool>>,
}

struct PollerState {
    probe: Arc<dyn FocusProbe>,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl FocusPoller {
    /// Creates a stopped poller. Focus starts out as `false`.
    pub fn new(probe: impl FocusProbe) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(PollerState {
                probe: Arc::new(probe),
                cancel: None,
                handle: None,
            })),
            tx: Arc::new(tx),
        }
    }

    /// Returns a receiver for focus changes.
    pub fn subscribe(&self) -> FocusReceiver {
        self.tx.subscribe()
    }

    /// Starts polling at the given interval, restarting if already running.
    pub async fn start(&self, interval: Duration) {
        self.stop().await;

        let mut state = self.inner.lock().await;
        let interval = interval.max(Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let probe = Arc::clone(&state.probe);
        let tx = Arc::clone(&self.tx);
        let token = cancel.clone();

        state.handle = Some(tokio::spawn(async move {
            poll_loop(probe, tx, interval, token).await;
        }));
        state.cancel = Some(cancel);

        tracing::info!(interval_ms = interval.as_millis() as u64, "focus poller started");
    }

    /// Stops polling and waits for the task to exit.
    pub async fn stop(&self) {
        let (cancel, handle) = {
            let mut state = self.inner.lock().await;
            (state.cancel.take(), state.handle.take())
        };
        let Some(cancel) = cancel else {
            return;
        };

        cancel.cancel();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "focus poller task ended abnormally");
            }
        }
        tracing::info!("focus poller stopped");
    }

    /// Returns `true` if the poller is running.
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.cancel.is_some()
    }
}

/// Main polling loop.
async fn poll_loop(
    probe: Arc<dyn FocusProbe>,
    tx: Arc<watch::Sender<bool>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let focused = probe.is_focused();
                let changed = tx.send_if_modified(|current| {
                    let changed = *current != focused;
                    *current = focused;
                    changed
                });
                if changed {
                    tracing::debug!(focused, "game focus changed");
                }
            }
        }
    }
}
