//! Presentation view model derived from a [`StateSnapshot`].

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::constants::IDLE_TIMER_TEXT;
use crate::queue::{QueueState, StateSnapshot};

/// Largest value the timer can display (99h 99m 99.9s worth of seconds).
const MAX_DISPLAY_MS: u128 = (99 * 3600 + 99 * 60) * 1000 + 99_900;

/// What the overlay should render right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    pub elapsed: Option<Duration>,
    pub map: Option<String>,
    pub visible: bool,
}

impl OverlayView {
    /// Derives the view from a snapshot at `now`.
    ///
    /// Idle hides the overlay and resets the timer. Waiting shows it with the
    /// time since the session started and the last known map, as long as the
    /// game window has focus.
    pub fn from_snapshot(snapshot: &StateSnapshot, focused: bool, now: DateTime<Utc>) -> Self {
        match &snapshot.state {
            QueueState::Idle => Self {
                elapsed: None,
                map: None,
                visible: false,
            },
            QueueState::Waiting(session) => Self {
                elapsed: Some(session.elapsed_at(now)),
                map: session.map.clone().or_else(|| snapshot.last_map.clone()),
                visible: focused,
            },
        }
    }

    /// Timer label, or the idle placeholder when no queue is running.
    pub fn timer_text(&self) -> String {
        match self.elapsed {
            Some(elapsed) => format_elapsed(elapsed),
            None => IDLE_TIMER_TEXT.to_string(),
        }
    }

    /// Map label shown under the timer.
    pub fn map_text(&self) -> String {
        match &self.map {
            Some(map) => format!("Map: {map}"),
            None => "Map: —".to_string(),
        }
    }
}

/// Formats a queue duration as `MM:SS.mmm`, or `HH:MM:SS.d` past one hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis().min(MAX_DISPLAY_MS);
    let total_secs = total_ms / 1000;
    let ms = total_ms % 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{hours:02}:{mins:02}:{secs:02}.{}", ms / 100)
    } else {
        format!("{mins:02}:{secs:02}.{ms:03}")
    }
}
