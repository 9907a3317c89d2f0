use chrono::{DateTime, Utc};
use queuetimer_protocol::QueueSession;

use crate::classify::classify;
use crate::machine::QueueMachine;
use crate::source::LineSource;

/// Line source, classifier and state machine for one log file.
///
/// Synchronous; the watcher drives it from its background task.
pub struct Pipeline {
    source: LineSource,
    machine: QueueMachine,
}

impl Pipeline {
    pub fn new(source: LineSource, machine: QueueMachine) -> Self {
        Self { source, machine }
    }

    pub fn machine(&self) -> &QueueMachine {
        &self.machine
    }

    pub fn source(&self) -> &LineSource {
        &self.source
    }

    /// Reads new lines, feeds their events in file order, then checks the
    /// grace period. Returns the sessions finalized along the way.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<QueueSession> {
        let mut finished = Vec::new();
        for line in self.source.poll() {
            finished.extend(self.feed_line(&line, now));
        }
        finished.extend(self.machine.tick(now));
        finished
    }

    /// Classifies one line and applies the resulting event, if any.
    pub fn feed_line(&mut self, line: &str, now: DateTime<Utc>) -> Option<QueueSession> {
        let event = classify(line)?;
        tracing::trace!(?event, line, "log event");
        self.machine.apply(event, now)
    }

    /// Returns the machine to idle. The read position is kept.
    pub fn reset(&mut self) {
        self.machine.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    use chrono::TimeZone;
    use queuetimer_protocol::QueueState;

    use super::*;
    use crate::machine::MaplessPolicy;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn append(path: &Path, lines: &[&str]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    fn pipeline(path: &Path, grace: Duration) -> Pipeline {
        Pipeline::new(
            LineSource::new(path),
            QueueMachine::new(grace, MaplessPolicy::Emit),
        )
    }

    #[test]
    fn scenario_with_zero_grace() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(
            &path,
            &["Server added your queue.", "Map cp_process loaded.", "Lobby created."],
        );

        let mut p = pipeline(&path, Duration::ZERO);
        let finished = p.poll(at(0));
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].map.as_deref(), Some("cp_process"));
        assert_eq!(p.machine().state(), &QueueState::Idle);
    }

    #[test]
    fn round_trip_across_polls() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        let mut p = pipeline(&path, Duration::from_secs(30));

        append(&path, &["[ReliableMsg] PartyQueueForMatch started"]);
        assert!(p.poll(at(0)).is_empty());
        append(&path, &["Map: cp_badlands"]);
        assert!(p.poll(at(10)).is_empty());
        append(&path, &["[ReliableMsg] AcceptLobbyInvite"]);

        let finished = p.poll(at(20));
        assert_eq!(finished.len(), 1);
        let session = &finished[0];
        assert_eq!(session.map.as_deref(), Some("cp_badlands"));
        assert!(session.ended_at.unwrap() >= session.started_at);
    }

    #[test]
    fn grace_elapses_between_polls() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        let mut p = pipeline(&path, Duration::from_secs(5));

        append(&path, &["[ReliableMsg] PartyQueueForMatch started", "Lobby created"]);
        assert!(p.poll(at(0)).is_empty());
        assert!(p.poll(at(4)).is_empty());

        let finished = p.poll(at(5));
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].map, None);
        assert!(p.poll(at(60)).is_empty());
    }

    #[test]
    fn empty_poll_keeps_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, &["[ReliableMsg] PartyQueueForMatch started"]);

        let mut p = pipeline(&path, Duration::from_secs(30));
        p.poll(at(0));
        let before = p.machine().state().clone();

        assert!(p.poll(at(100)).is_empty());
        assert_eq!(p.machine().state(), &before);
    }

    #[test]
    fn unrecognized_line_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = pipeline(&tmp.path().join("console.log"), Duration::ZERO);
        assert_eq!(p.feed_line("random chat message", at(0)), None);
        assert_eq!(p.machine().state(), &QueueState::Idle);
    }

    #[test]
    fn truncation_replay_keeps_session_start() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(
            &path,
            &[
                "[PartyClient] Entering queue for match group 12v12 Casual Match",
                "padding line so the rewritten file is shorter than the cursor",
            ],
        );

        let mut p = pipeline(&path, Duration::from_secs(30));
        p.poll(at(0));

        std::fs::write(&path, "[ReliableMsg] PartyQueueForMatch started\n").unwrap();
        assert!(p.poll(at(50)).is_empty());
        assert_eq!(p.machine().state().session().unwrap().started_at, at(0));
        assert_eq!(p.source().cursor().offset(), 41);
    }

    #[test]
    fn reset_returns_to_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let mut p = pipeline(&tmp.path().join("console.log"), Duration::ZERO);
        p.feed_line("[ReliableMsg] PartyQueueForMatch started", at(0));
        p.reset();
        assert_eq!(p.machine().state(), &QueueState::Idle);
    }
}
