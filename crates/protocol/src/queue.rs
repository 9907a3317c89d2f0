use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One span of time between joining matchmaking and a lobby being assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSession {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
}

impl QueueSession {
    /// Starts a session at the given instant with no end and no map.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: None,
            map: None,
        }
    }

    /// Whether a lobby has been assigned for this session.
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Time spent in queue, or `None` while the session is still running.
    pub fn queue_time(&self) -> Option<Duration> {
        self.ended_at.map(|end| span(self.started_at, end))
    }

    /// Time spent in queue as seen at `now`. Frozen once the session ended.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        span(self.started_at, self.ended_at.unwrap_or(now))
    }
}

/// Non-negative span between two instants; a clock step backwards yields zero.
fn span(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}

/// Queue lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QueueState {
    #[default]
    Idle,
    Waiting(QueueSession),
}

impl QueueState {
    /// Whether a queue is in progress.
    pub fn is_waiting(&self) -> bool {
        matches!(self, QueueState::Waiting(_))
    }

    /// The in-flight session, if any.
    pub fn session(&self) -> Option<&QueueSession> {
        match self {
            QueueState::Idle => None,
            QueueState::Waiting(session) => Some(session),
        }
    }

    /// Short label used in logs and the status pill.
    pub fn label(&self) -> &'static str {
        match self {
            QueueState::Idle => "IDLE",
            QueueState::Waiting(_) => "QUEUEING",
        }
    }
}

/// Point-in-time copy of the watcher's state handed to presentation consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub state: QueueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_map: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StateSnapshot {
    /// The initial snapshot: idle, no map.
    pub fn idle(timestamp: DateTime<Utc>) -> Self {
        Self {
            state: QueueState::Idle,
            last_map: None,
            timestamp,
        }
    }
}
