//! Application orchestrator: wires the log watcher, focus poller and
//! session log together and renders the overlay state to the log.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use queuetimer_focus::{FocusPoller, FocusReceiver, ProcessFocusProbe};
use queuetimer_game_log::{OnSessionFn, QueueWatcher};
use queuetimer_protocol::{OverlayView, QueueSession};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::sessions::SessionLog;

/// How often the running timer is re-rendered.
const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Commands read from stdin, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Drop the running session and return to idle.
    Reset,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "r" | "reset" => Some(Self::Reset),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Runs the agent until shutdown is requested.
pub async fn run(config: Config, log_path: PathBuf) -> anyhow::Result<()> {
    prepare_log(&log_path, config.clear_log_on_start);

    // -- Log watcher --
    let (on_session, writer) = session_writer(config.session_log.clone().map(SessionLog::new));
    let watcher = QueueWatcher::new(config.watcher_config(log_path), on_session);

    // -- Focus poller --
    let focus = FocusPoller::new(ProcessFocusProbe::new(config.focus_process.clone()));

    let focused = focus.subscribe();

    // -- Start services --
    watcher.start().await;
    focus.start(config.focus_interval()).await;

    tracing::info!("agent ready; type `reset` to clear the timer, `quit` to exit");

    // -- Main loop: render until shutdown --
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    match event_loop(&watcher, focused, BufReader::new(tokio::io::stdin()), ctrl_c).await {
        Exit::Signal => tracing::info!("SIGINT received, shutting down"),
        Exit::Quit => tracing::info!("quit requested, shutting down"),
    }

    // -- Graceful shutdown --
    tracing::info!("stopping services...");
    watcher.stop().await;
    focus.stop().await;

    // Dropping the watcher releases the callback, which lets the writer drain.
    drop(watcher);
    if let Some(writer) = writer {
        if let Err(e) = writer.await {
            tracing::warn!(error = %e, "session writer ended abnormally");
        }
    }

    Ok(())
}

/// Why the main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Signal,
    Quit,
}

/// Renders the overlay and handles input commands until `shutdown`
/// completes or a quit command arrives.
///
/// `shutdown` is polled for the whole loop, so it is never missed while a
/// frame is being rendered.
async fn event_loop<R, F>(
    watcher: &QueueWatcher,
    mut focused: FocusReceiver,
    input: R,
    shutdown: F,
) -> Exit
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut snapshots = watcher.subscribe();
    let mut renderer = Renderer::default();
    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut lines = input.lines();
    let mut input_open = true;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => return Exit::Signal,
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(Command::Reset) => watcher.reset().await,
                    Some(Command::Quit) => return Exit::Quit,
                    None if line.trim().is_empty() => {}
                    None => tracing::warn!(input = %line.trim(), "unknown command"),
                },
                Ok(None) => input_open = false,
                Err(e) => {
                    tracing::debug!(error = %e, "command input closed");
                    input_open = false;
                }
            },
            Ok(()) = snapshots.changed() => {}
            Ok(()) = focused.changed() => {}
            _ = refresh.tick() => {}
        }

        let view = {
            let snapshot = snapshots.borrow_and_update();
            OverlayView::from_snapshot(&snapshot, *focused.borrow_and_update(), Utc::now())
        };
        renderer.render(&view);
    }
}

/// Builds the session callback.
///
/// The callback only queues the session; a separate task appends it to the
/// CSV file on the blocking pool, in the order sessions finished.
fn session_writer(log: Option<SessionLog>) -> (OnSessionFn, Option<JoinHandle<()>>) {
    let Some(log) = log else {
        return (Box::new(|_| {}), None);
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<QueueSession>();
    let handle = tokio::spawn(async move {
        while let Some(session) = rx.recv().await {
            let log = log.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || log.record(&session)).await {
                tracing::warn!(error = %e, "session write task failed");
            }
        }
    });

    let on_session: OnSessionFn = Box::new(move |session| {
        let _ = tx.send(session);
    });
    (on_session, Some(handle))
}

/// Empties the console log if requested and warns when it does not exist yet.
fn prepare_log(path: &Path, clear: bool) {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "console log not found; launch the game with -condebug"
        );
        return;
    }
    if clear {
        match std::fs::OpenOptions::new().write(true).open(path) {
            Ok(file) => match file.set_len(0) {
                Ok(()) => tracing::info!(path = %path.display(), "console log cleared"),
                Err(e) => tracing::warn!(error = %e, "failed to clear console log"),
            },
            Err(e) => tracing::warn!(error = %e, "failed to open console log"),
        }
    }
}

/// Headless overlay: reports visibility and map changes at info, timer ticks
/// at debug.
#[derive(Default)]
struct Renderer {
    last: Option<OverlayView>,
}

impl Renderer {
    /// Returns `true` when the visible content changed apart from the timer.
    fn render(&mut self, view: &OverlayView) -> bool {
        let changed = self
            .last
            .as_ref()
            .is_none_or(|last| last.visible != view.visible || last.map != view.map);

        if changed {
            if view.visible {
                tracing::info!(timer = %view.timer_text(), map = %view.map_text(), "overlay shown");
            } else {
                tracing::info!("overlay hidden");
            }
        } else if view.visible {
            tracing::debug!(timer = %view.timer_text(), "overlay");
        }

        self.last = Some(view.clone());
        changed
    }
}
