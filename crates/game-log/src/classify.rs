//! Maps raw console lines to queue events.

use std::sync::LazyLock;

use regex_lite::Regex;

/// A queue-relevant event recognized in the console log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// The party entered the casual matchmaking queue.
    QueueStarted,
    /// A lobby was assigned; the queue is over.
    MatchFound,
    /// The client announced the map it is loading.
    MapLoaded(String),
}

static QUEUE_STARTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\[PartyClient\] (?:Requesting queue for|Entering queue for match group) .*Casual Match\b",
        r"|^\[ReliableMsg\] PartyQueueForMatch started\b",
        r"|(?i:^Server added your queue\b)",
    ))
    .expect("queue start pattern is valid")
});

static MATCH_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\[PartyClient\] Leaving queue for match group .*Casual Match\b",
        r"|^\[ReliableMsg\] AcceptLobbyInvite\b",
        r"|^Lobby created\.?\s*$",
        r"|^Differing lobby received\.",
    ))
    .expect("match found pattern is valid")
});

static MAP_LOADED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Map:\s*([A-Za-z0-9_]+)|(?i:^Map\s+([A-Za-z0-9_]+)\s+loaded\b)")
        .expect("map pattern is valid")
});

/// Classifies a single log line. Unrecognized input yields `None`.
///
/// Map announcements are checked first, then queue start, then match found.
pub fn classify(line: &str) -> Option<DomainEvent> {
    if let Some(caps) = MAP_LOADED.captures(line) {
        let name = caps.get(1).or_else(|| caps.get(2))?;
        return Some(DomainEvent::MapLoaded(name.as_str().to_string()));
    }
    if QUEUE_STARTED.is_match(line) {
        return Some(DomainEvent::QueueStarted);
    }
    if MATCH_FOUND.is_match(line) {
        return Some(DomainEvent::MatchFound);
    }
    None
}
