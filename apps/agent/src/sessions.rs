//! CSV history of finished queue sessions.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use queuetimer_protocol::QueueSession;

const HEADER: &str = "started_at,ended_at,queue_seconds,map";

/// Appends finished sessions to a CSV file, one row each.
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, writing the header first if the file is new or empty.
    pub fn append(&self, session: &QueueSession) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if file.metadata()?.len() == 0 {
            writeln!(file, "{HEADER}")?;
        }
        writeln!(file, "{}", format_row(session))
    }

    /// Like [`append`](Self::append), but logs failures instead of returning them.
    pub fn record(&self, session: &QueueSession) {
        if let Err(e) = self.append(session) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to record queue session"
            );
        }
    }
}

fn format_row(session: &QueueSession) -> String {
    let started = session
        .started_at
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let ended = session
        .ended_at
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default();
    let seconds = session
        .queue_time()
        .map(|d| format!("{:.3}", d.as_secs_f64()))
        .unwrap_or_default();
    let map = session.map.as_deref().map(escape).unwrap_or_default();
    format!("{started},{ended},{seconds},{map}")
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
