// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Incremental, rotation-aware tailing of a log file.
//!
//! The file is polled rather than watched. Every poll stats the open handle
//! and the path:
//!
//! - no handle yet, or the handle was unlinked: (re)open, no lines this poll
//! - the path now names another file (rename rotation): reopen at offset 0
//! - the file shrank below the read offset (truncation): read from 0
//! - otherwise: read the complete lines appended since the last poll
//!
//! Only the very first open skips existing content.

use std::fs::{self, File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use super::LogReader;
use crate::constants::{DEFAULT_TAIL_INTERVAL, MAX_LINE_LENGTH};

/// Device and inode of a file, stable across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;

        Some(FileId {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

#[cfg(unix)]
fn is_unlinked(metadata: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;

    metadata.nlink() == 0
}

#[cfg(not(unix))]
fn is_unlinked(_metadata: &Metadata) -> bool {
    false
}

#[derive(Debug)]
struct TailState {
    file: Option<File>,
    id: Option<FileId>,
    offset: u64,
    last_poll: Option<Instant>,
    interval: Duration,
    max_line_length: usize,
    attached_once: bool,
}

#[derive(Debug)]
pub struct StreamReader {
    path: PathBuf,
    state: TailState,
}

impl StreamReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StreamReader {
            path: path.as_ref().to_path_buf(),
            state: TailState {
                file: None,
                id: None,
                offset: 0,
                last_poll: None,
                interval: DEFAULT_TAIL_INTERVAL,
                max_line_length: MAX_LINE_LENGTH,
                attached_once: false,
            },
        }
    }

    /// Minimum time between two reads; calls in between return nothing.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.state.interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.state.max_line_length = max_line_length.max(1);
        self
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.state.offset
    }

    /// Drops the handle after a failed read; the next poll reattaches.
    fn detach(&mut self) {
        self.state.file = None;
    }

    /// Opens the path. The first open starts at the end of the file, reopening
    /// the file last read from resumes at its offset, anything else starts at 0.
    fn attach(&mut self) -> io::Result<()> {
        self.state.file = None;
        let file = File::open(&self.path)?;
        let metadata = file.metadata()?;
        let id = FileId::from_metadata(&metadata);

        let resumed = id.is_some() && id == self.state.id && self.state.offset <= metadata.len();
        if !self.state.attached_once {
            self.state.offset = metadata.len();
        } else if !resumed {
            self.state.offset = 0;
        }
        self.state.id = id;
        self.state.file = Some(file);

        debug!(
            "Attached to {} at offset {}",
            self.path.display(),
            self.state.offset
        );
        self.state.attached_once = true;
        Ok(())
    }

    /// Whether the path now names a different file than the open handle.
    fn is_replaced(&self) -> bool {
        match fs::metadata(&self.path) {
            Ok(metadata) => FileId::from_metadata(&metadata) != self.state.id,
            Err(_) => false,
        }
    }

    fn poll(&mut self) -> io::Result<Vec<String>> {
        let Some(file) = self.state.file.as_ref() else {
            self.attach()?;
            return Ok(Vec::new());
        };

        let metadata = file.metadata()?;
        if is_unlinked(&metadata) {
            debug!("{} was removed, reattaching", self.path.display());
            self.state.id = None;
            self.attach()?;
            return Ok(Vec::new());
        }
        if self.is_replaced() {
            debug!("{} was rotated, reattaching", self.path.display());
            self.state.id = None;
            self.attach()?;
            return Ok(Vec::new());
        }

        let len = metadata.len();
        if len < self.state.offset {
            debug!("{} was truncated, reading from the start", self.path.display());
            self.state.offset = 0;
        }
        if len == self.state.offset {
            return Ok(Vec::new());
        }

        let mut buffer = Vec::new();
        if let Some(file) = self.state.file.as_mut() {
            file.seek(SeekFrom::Start(self.state.offset))?;
            file.take(len - self.state.offset).read_to_end(&mut buffer)?;
        }

        let (lines, consumed) = split_lines(&buffer, self.state.max_line_length);
        self.state.offset += consumed as u64;
        Ok(lines)
    }
}

impl LogReader for StreamReader {
    fn read_lines(&mut self) -> Vec<String> {
        let now = Instant::now();
        if let Some(last_poll) = self.state.last_poll {
            if now.duration_since(last_poll) < self.state.interval {
                return Vec::new();
            }
        }
        self.state.last_poll = Some(now);

        match self.poll() {
            Ok(lines) => lines,
            Err(e) => {
                debug!("Unable to read {}: {}", self.path.display(), e);
                self.detach();
                Vec::new()
            }
        }
    }
}

/// Splits `buffer` into lines, returning them with the number of bytes consumed.
///
/// A trailing unterminated line is left for the next poll unless it already
/// reaches `max_line_length`.
fn split_lines(buffer: &[u8], max_line_length: usize) -> (Vec<String>, usize) {
    let mut lines = Vec::new();
    let mut consumed = 0;

    while consumed < buffer.len() {
        let rest = &buffer[consumed..];
        match rest.iter().position(|b| *b == b'\n') {
            Some(end) => {
                let line = rest[..end].strip_suffix(b"\r").unwrap_or(&rest[..end]);
                push_chunks(&mut lines, line, max_line_length);
                consumed += end + 1;
            }
            None => {
                let complete = rest.len() - rest.len() % max_line_length;
                push_chunks(&mut lines, &rest[..complete], max_line_length);
                consumed += complete;
                break;
            }
        }
    }

    (lines, consumed)
}

fn push_chunks(lines: &mut Vec<String>, line: &[u8], max_line_length: usize) {
    for chunk in line.chunks(max_line_length) {
        if !chunk.is_empty() {
            lines.push(String::from_utf8_lossy(chunk).into_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::TempDir;

    fn append(path: &Path, content: &[u8]) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
    }

    fn reader(dir: &TempDir) -> (PathBuf, StreamReader) {
        let path = dir.path().join("laravel.log");
        let reader = StreamReader::new(&path).with_interval(Duration::ZERO);
        (path, reader)
    }

    #[test]
    fn test_first_attach_skips_history() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"old line\n");

        assert!(reader.read_lines().is_empty());
        assert_eq!(reader.offset(), 9);

        append(&path, b"new line\n");
        assert_eq!(reader.read_lines(), vec!["new line"]);
        assert!(reader.read_lines().is_empty());
    }

    #[test]
    fn test_incremental_reads() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        assert!(reader.read_lines().is_empty());

        append(&path, b"line 1\nline 2\n");
        assert_eq!(reader.read_lines(), vec!["line 1", "line 2"]);

        append(&path, b"line 3\n");
        assert_eq!(reader.read_lines(), vec!["line 3"]);
    }

    #[test]
    fn test_truncated_file_is_read_from_start() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();
        append(&path, b"a long first line\nanother line\n");
        assert_eq!(reader.read_lines().len(), 2);

        fs::write(&path, b"short\n").unwrap();
        assert_eq!(reader.read_lines(), vec!["short"]);
        assert_eq!(reader.offset(), 6);
    }

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();

        append(&path, b"part");
        assert!(reader.read_lines().is_empty());
        append(&path, b"ial\n");
        assert_eq!(reader.read_lines(), vec!["partial"]);
    }

    #[test]
    fn test_crlf_and_empty_lines() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();

        append(&path, b"first\r\n\r\n\nsecond\n");
        assert_eq!(reader.read_lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();

        append(&path, b"caf\xe9\n");
        assert_eq!(reader.read_lines(), vec!["caf\u{fffd}"]);
    }

    #[test]
    fn test_interval_gates_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("laravel.log");
        append(&path, b"");
        let mut reader = StreamReader::new(&path).with_interval(Duration::from_secs(3600));

        assert!(reader.read_lines().is_empty());
        append(&path, b"too soon\n");
        assert!(reader.read_lines().is_empty());
        assert_eq!(reader.offset(), 0);
    }

    #[test]
    fn test_missing_file_is_retried() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);

        assert!(reader.read_lines().is_empty());
        append(&path, b"before attach\n");
        assert!(reader.read_lines().is_empty());
        append(&path, b"after attach\n");
        assert_eq!(reader.read_lines(), vec!["after attach"]);
    }

    #[test]
    fn test_split_lines_chunks_long_lines() {
        let (lines, consumed) = split_lines(b"abcdefghij\nxy", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
        assert_eq!(consumed, 11);

        let (lines, consumed) = split_lines(b"abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh"]);
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_long_lines_are_emitted_in_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("laravel.log");
        append(&path, b"");
        let mut reader = StreamReader::new(&path)
            .with_interval(Duration::ZERO)
            .with_max_line_length(4);
        reader.read_lines();

        append(&path, b"abcdefghij
xyzuvw");
        assert_eq!(reader.read_lines(), vec!["abcd", "efgh", "ij", "xyzu"]);
        assert_eq!(reader.offset(), 15);

        append(&path, b"
");
        assert_eq!(reader.read_lines(), vec!["vw"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_reattach_after_read_error_resumes_offset() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();
        append(&path, b"already sent
");
        assert_eq!(reader.read_lines(), vec!["already sent"]);

        reader.detach();
        append(&path, b"new line
");

        assert!(reader.read_lines().is_empty());
        assert_eq!(reader.offset(), 13);
        assert_eq!(reader.read_lines(), vec!["new line"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_rotation_reopens_at_start() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();
        append(&path, b"before rotation\n");
        assert_eq!(reader.read_lines(), vec!["before rotation"]);

        fs::rename(&path, dir.path().join("laravel.log.1")).unwrap();
        append(&path, b"fresh\n");

        assert!(reader.read_lines().is_empty());
        assert_eq!(reader.read_lines(), vec!["fresh"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_deleted_file_is_reattached() {
        let dir = TempDir::new().unwrap();
        let (path, mut reader) = reader(&dir);
        append(&path, b"");
        reader.read_lines();

        fs::remove_file(&path).unwrap();
        assert!(reader.read_lines().is_empty());

        append(&path, b"recreated\n");
        assert!(reader.read_lines().is_empty());
        assert_eq!(reader.read_lines(), vec!["recreated"]);
    }
}
