use std::time::Duration;

/// How often the log watcher polls `console.log` by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lower bound for the log poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound for the log poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How long a finished session waits for a map announcement by default.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// How often the focus poller checks the foreground window by default.
pub const DEFAULT_FOCUS_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum bytes consumed from the log in a single poll (256 KiB).
pub const MAX_POLL_BYTES: usize = 256 * 1024;

/// Maximum lines returned from the log in a single poll.
pub const MAX_POLL_LINES: usize = 250;

/// Executable name of the 64-bit Windows game client.
pub const GAME_PROCESS_NAME: &str = "tf_win64.exe";

/// File the game writes when launched with `-condebug`.
pub const CONSOLE_LOG_NAME: &str = "console.log";

/// Placeholder shown by the overlay when no timer is running.
pub const IDLE_TIMER_TEXT: &str = "--:--.---";
