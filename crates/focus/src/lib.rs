//! Foreground window polling.
//!
//! Runs independently of the log watcher, on its own interval, and publishes
//! whether the game window has focus through a watch channel.

mod poller;

#[cfg(target_os = "windows")]
#[path = "focus_windows.rs"]
mod platform;

#[cfg(not(target_os = "windows"))]
#[path = "focus_other.rs"]
mod platform;

pub use poller::{FocusPoller, FocusReceiver};

/// Answers whether the overlay's target window is in the foreground.
pub trait FocusProbe: Send + Sync + 'static {
    fn is_focused(&self) -> bool;
}

/// Matches the foreground window's process against an executable name.
///
/// Platforms without a foreground-window query always report focus, so the
/// overlay follows the queue state alone.
#[derive(Debug, Clone)]
pub struct ProcessFocusProbe {
    process_name: String,
}

impl ProcessFocusProbe {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }
}

impl FocusProbe for ProcessFocusProbe {
    fn is_focused(&self) -> bool {
        match platform::foreground_process_name() {
            Some(name) => name.eq_ignore_ascii_case(&self.process_name),
            None => !platform::SUPPORTED,
        }
    }
}
