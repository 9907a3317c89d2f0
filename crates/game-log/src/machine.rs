//! Queue lifecycle state machine.
//!
//! Pure: every operation takes the observation time, so the resulting state
//! depends only on the sequence of events and times fed in.

use std::time::Duration;

use chrono::{DateTime, Utc};
use queuetimer_protocol::{QueueSession, QueueState, StateSnapshot};
use serde::{Deserialize, Serialize};

use crate::classify::DomainEvent;

/// What to do with a session whose grace period ran out before a map showed up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaplessPolicy {
    /// Hand the session on without a map.
    #[default]
    Emit,
    /// Drop the session silently.
    Discard,
}

/// Tracks the queue state, the last announced map and any session that has
/// ended but is still waiting for its map.
#[derive(Debug, Clone)]
pub struct QueueMachine {
    state: QueueState,
    pending: Option<QueueSession>,
    last_map: Option<String>,
    grace: Duration,
    mapless: MaplessPolicy,
}

impl QueueMachine {
    /// Creates an idle machine.
    pub fn new(grace: Duration, mapless: MaplessPolicy) -> Self {
        Self {
            state: QueueState::Idle,
            pending: None,
            last_map: None,
            grace,
            mapless,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// Most recently announced map, whether or not a session was running.
    pub fn last_map(&self) -> Option<&str> {
        self.last_map.as_deref()
    }

    /// Ended session still waiting for its map, if any.
    pub fn pending(&self) -> Option<&QueueSession> {
        self.pending.as_ref()
    }

    /// Copies the observable state for presentation.
    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> StateSnapshot {
        StateSnapshot {
            state: self.state.clone(),
            last_map: self.last_map.clone(),
            timestamp,
        }
    }

    /// Applies one event observed at `now`.
    ///
    /// Returns the session finalized by this event, if any.
    pub fn apply(&mut self, event: DomainEvent, now: DateTime<Utc>) -> Option<QueueSession> {
        match event {
            DomainEvent::QueueStarted => self.on_queue_started(now),
            DomainEvent::MatchFound => self.on_match_found(now),
            DomainEvent::MapLoaded(map) => self.on_map_loaded(map),
        }
    }

    /// Finalizes a pending session once its grace period has run out.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<QueueSession> {
        let ended_at = self.pending.as_ref()?.ended_at?;
        let waited = (now - ended_at).to_std().unwrap_or(Duration::ZERO);
        if waited < self.grace {
            return None;
        }
        tracing::debug!(?waited, "no map announced within grace period");
        self.flush_mapless()
    }

    /// Drops all progress and returns to idle without emitting anything.
    pub fn reset(&mut self) {
        self.state = QueueState::Idle;
        self.pending = None;
        self.last_map = None;
    }

    fn on_queue_started(&mut self, now: DateTime<Utc>) -> Option<QueueSession> {
        if self.state.is_waiting() {
            // Replayed or repeated start: keep the original start time.
            return None;
        }
        let flushed = self.flush_mapless();
        self.state = QueueState::Waiting(QueueSession::new(now));
        tracing::debug!(started_at = %now, "queue started");
        flushed
    }

    fn on_match_found(&mut self, now: DateTime<Utc>) -> Option<QueueSession> {
        let QueueState::Waiting(mut session) = std::mem::take(&mut self.state) else {
            return None;
        };
        session.ended_at = Some(now);
        tracing::debug!(ended_at = %now, map = ?session.map, "match found");

        if session.map.is_some() {
            return Some(session);
        }
        self.pending = Some(session);
        self.tick(now)
    }

    fn on_map_loaded(&mut self, map: String) -> Option<QueueSession> {
        self.last_map = Some(map.clone());

        match &mut self.state {
            QueueState::Waiting(session) => {
                session.map = Some(map);
                None
            }
            QueueState::Idle => {
                let mut session = self.pending.take()?;
                session.map = Some(map);
                Some(session)
            }
        }
    }

    fn flush_mapless(&mut self) -> Option<QueueSession> {
        let session = self.pending.take()?;
        match self.mapless {
            MaplessPolicy::Emit => Some(session),
            MaplessPolicy::Discard => {
                tracing::debug!("discarding session without map");
                None
            }
        }
    }
}
