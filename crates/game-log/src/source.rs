//! Incremental line reader for a log file written by another process.
//!
//! The file is reopened on every poll and read from the [`LogCursor`]
//! onwards. Truncation, replacement and deletion reset the cursor to the
//! start of the file instead of failing.

use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use queuetimer_protocol::constants::{MAX_POLL_BYTES, MAX_POLL_LINES};

/// Identity of a file on disk, used to notice rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity(Fingerprint);

#[cfg(unix)]
type Fingerprint = (u64, u64);

#[cfg(not(unix))]
type Fingerprint = Option<std::time::SystemTime>;

impl FileIdentity {
    /// Device and inode on Unix, creation time elsewhere.
    pub fn of(meta: &Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self((meta.dev(), meta.ino()))
        }

        #[cfg(not(unix))]
        {
            Self(meta.created().ok())
        }
    }
}

/// Bookmark into the log's byte stream.
///
/// The offset only moves forward while the file identity stays the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCursor {
    offset: u64,
    identity: Option<FileIdentity>,
}

impl LogCursor {
    /// Byte offset of the first unread byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Identity of the file the offset refers to, if it has been seen.
    pub fn identity(&self) -> Option<FileIdentity> {
        self.identity
    }

    /// Checks the cursor against the file as it is now.
    ///
    /// Returns `true` when the file was replaced or shrank below the cursor,
    /// in which case the cursor restarts at zero.
    fn sync(&mut self, identity: FileIdentity, len: u64) -> bool {
        let replaced = self.identity.is_some_and(|known| known != identity);
        let shrank = self.offset > len;
        self.identity = Some(identity);
        if replaced || shrank {
            self.offset = 0;
            true
        } else {
            false
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.offset += bytes;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Yields lines appended to a file since the previous poll.
pub struct LineSource {
    path: PathBuf,
    cursor: LogCursor,
    max_bytes: usize,
    max_lines: usize,
    buf: Vec<u8>,
}

impl LineSource {
    /// Creates a source that reads the file from its first byte.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cursor: LogCursor::default(),
            max_bytes: MAX_POLL_BYTES,
            max_lines: MAX_POLL_LINES,
            buf: Vec::new(),
        }
    }

    /// Creates a source that skips whatever the file already contains.
    ///
    /// If the file does not exist yet it will be read from the start once it
    /// appears.
    pub fn from_end(path: impl Into<PathBuf>) -> Self {
        let mut source = Self::new(path);
        if let Ok(meta) = std::fs::metadata(&source.path) {
            source.cursor.sync(FileIdentity::of(&meta), meta.len());
            source.cursor.advance(meta.len());
        }
        source
    }

    /// Overrides the per-poll byte and line caps. Zero keeps the default.
    pub fn with_limits(mut self, max_bytes: usize, max_lines: usize) -> Self {
        if max_bytes > 0 {
            self.max_bytes = max_bytes;
        }
        if max_lines > 0 {
            self.max_lines = max_lines;
        }
        self
    }

    /// Path of the tailed file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current read position.
    pub fn cursor(&self) -> &LogCursor {
        &self.cursor
    }

    /// Returns complete lines appended since the last poll, in file order.
    ///
    /// Never fails: a missing or unreadable file yields no lines.
    pub fn poll(&mut self) -> Vec<String> {
        match self.read_new_lines() {
            Ok(lines) => lines,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "log not readable this tick");
                Vec::new()
            }
        }
    }

    fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if self.cursor.identity().is_some() {
                    tracing::info!(path = %self.path.display(), "log file disappeared");
                }
                self.cursor.clear();
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let meta = file.metadata()?;
        if self.cursor.sync(FileIdentity::of(&meta), meta.len()) {
            tracing::info!(
                path = %self.path.display(),
                len = meta.len(),
                "log truncated or replaced, rescanning from start"
            );
        }

        if meta.len() <= self.cursor.offset() {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.cursor.offset()))?;
        self.buf.clear();
        file.take(self.max_bytes as u64).read_to_end(&mut self.buf)?;

        let full = self.buf.len() >= self.max_bytes;
        let (lines, consumed) = split_lines(&self.buf, self.max_lines, full);
        self.cursor.advance(consumed as u64);
        Ok(lines)
    }
}

/// Splits `buf` into complete lines, up to `max_lines` non-blank ones.
///
/// Returns the lines and how many bytes they covered. An unterminated tail
/// is left unconsumed, unless the buffer is `full` and holds no newline at
/// all: then it is one oversized line and is returned as a piece.
fn split_lines(buf: &[u8], max_lines: usize, full: bool) -> (Vec<String>, usize) {
    let mut lines = Vec::new();
    let mut consumed = 0;

    while lines.len() < max_lines {
        let rest = &buf[consumed..];
        let Some(end) = rest.iter().position(|&b| b == b'\n') else {
            break;
        };
        consumed += end + 1;
        if let Some(line) = decode_line(&rest[..end]) {
            lines.push(line);
        }
    }

    if consumed == 0 && full && !buf.is_empty() {
        consumed = buf.len();
        lines.extend(decode_line(buf));
    }

    (lines, consumed)
}

/// Lossy UTF-8 decode with the line terminator removed; blank lines are `None`.
fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\r', '\n']);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn split_lines_defers_partial_tail() {
        let (lines, consumed) = split_lines(b"one\ntwo\nthr", 10, false);
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(consumed, 8);
    }

    #[test]
    fn split_lines_strips_crlf_and_skips_blank() {
        let (lines, consumed) = split_lines(b"a\r\n\r\n   \nb\n", 10, false);
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(consumed, 11);
    }

    #[test]
    fn split_lines_respects_line_cap() {
        let (lines, consumed) = split_lines(b"1\n2\n3\n", 2, false);
        assert_eq!(lines, vec!["1", "2"]);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn split_lines_oversized_line_is_emitted_in_pieces() {
        let (lines, consumed) = split_lines(b"abcdef", 10, true);
        assert_eq!(lines, vec!["abcdef"]);
        assert_eq!(consumed, 6);

        let (lines, consumed) = split_lines(b"abcdef", 10, false);
        assert!(lines.is_empty());
        assert_eq!(consumed, 0);
    }

    #[test]
    fn split_lines_tolerates_invalid_utf8() {
        let (lines, _) = split_lines(b"\xff\xfebad\x00bytes\n", 10, false);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("bad"));
    }

    #[test]
    fn missing_file_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = LineSource::new(tmp.path().join("console.log"));
        assert!(source.poll().is_empty());
        assert_eq!(source.cursor().offset(), 0);
        assert!(source.cursor().identity().is_none());
    }

    #[test]
    fn reads_only_new_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "first\nsecond\n");

        let mut source = LineSource::new(&path);
        assert_eq!(source.poll(), vec!["first", "second"]);
        assert!(source.poll().is_empty());

        append(&path, "third\n");
        assert_eq!(source.poll(), vec!["third"]);
        assert_eq!(source.cursor().offset(), 19);
    }

    #[test]
    fn partial_line_is_completed_on_next_poll() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "Lobby cre");

        let mut source = LineSource::new(&path);
        assert!(source.poll().is_empty());
        assert_eq!(source.cursor().offset(), 0);

        append(&path, "ated\n");
        assert_eq!(source.poll(), vec!["Lobby created"]);
    }

    #[test]
    fn truncation_rescans_from_start() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "a long line that sets the cursor far out\n");

        let mut source = LineSource::new(&path);
        assert_eq!(source.poll().len(), 1);

        std::fs::write(&path, "short\n").unwrap();
        assert_eq!(source.poll(), vec!["short"]);
        assert_eq!(source.cursor().offset(), 6);
    }

    #[test]
    fn deleted_then_recreated_file_is_read_from_start() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "old\n");

        let mut source = LineSource::new(&path);
        assert_eq!(source.poll(), vec!["old"]);

        std::fs::remove_file(&path).unwrap();
        assert!(source.poll().is_empty());
        assert_eq!(source.cursor().offset(), 0);

        append(&path, "new\n");
        assert_eq!(source.poll(), vec!["new"]);
    }

    // Windows may tunnel the old creation time onto a file renamed into place.
    #[cfg(unix)]
    #[test]
    fn replaced_file_larger_than_cursor_is_read_from_start() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "old\n");

        let mut source = LineSource::new(&path);
        assert_eq!(source.poll(), vec!["old"]);
        let before = source.cursor().identity();

        let staged = tmp.path().join("console.log.new");
        append(&staged, "first of new file\nsecond\n");
        std::fs::rename(&staged, &path).unwrap();

        assert_eq!(source.poll(), vec!["first of new file", "second"]);
        assert_ne!(source.cursor().identity(), before);
        assert_eq!(source.cursor().offset(), 25);
    }

    #[test]
    fn from_end_skips_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "history\n");

        let mut source = LineSource::from_end(&path);
        assert!(source.poll().is_empty());

        append(&path, "fresh\n");
        assert_eq!(source.poll(), vec!["fresh"]);
    }

    #[test]
    fn from_end_on_missing_file_reads_from_start_later() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");

        let mut source = LineSource::from_end(&path);
        append(&path, "hello\n");
        assert_eq!(source.poll(), vec!["hello"]);
    }

    #[test]
    fn byte_cap_spreads_burst_over_polls() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("console.log");
        append(&path, "aaaa\nbbbb\ncccc\n");

        let mut source = LineSource::new(&path).with_limits(8, 0);
        assert_eq!(source.poll(), vec!["aaaa"]);
        assert_eq!(source.poll(), vec!["bbbb"]);
        assert_eq!(source.poll(), vec!["cccc"]);
        assert!(source.poll().is_empty());
    }
}
