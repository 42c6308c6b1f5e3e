//! Streaming transcript reader
//!
//! [`TranscriptReader`] is a lazy, finite iterator over the [`Event`]s of one
//! transcript. It never loads the whole file and never surfaces per-line
//! problems to the caller:
//!
//! - **Blank lines**: counted, skipped.
//! - **Malformed lines** (invalid JSON, invalid UTF-8, undecodable
//!   `message` body): counted, logged at debug level, skipped.
//! - **I/O failure mid-stream**: iteration stops and the error is held until
//!   [`TranscriptReader::finish`], so the caller can discard whatever it
//!   folded from this transcript.

use super::record::Event;
use crate::error::Result;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Line counters for one pass over a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Lines read, including blank and malformed ones
    pub lines: usize,
    /// Whitespace-only lines
    pub blank: usize,
    /// Lines that failed to decode
    pub malformed: usize,
    /// Events yielded
    pub events: usize,
}

/// Lazy event iterator over one transcript file.
pub struct TranscriptReader<R = BufReader<File>> {
    reader: R,
    path: PathBuf,
    buf: Vec<u8>,
    stats: ReadStats,
    failure: Option<io::Error>,
    done: bool,
}

impl TranscriptReader {
    /// Open a transcript for reading.
    ///
    /// Fails only when the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            io::Error::new(e.kind(), format!("failed to open {}: {}", path.display(), e))
        })?;
        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<R: BufRead> TranscriptReader<R> {
    /// Wrap any buffered reader; `path` is used for diagnostics only.
    pub fn from_reader(reader: R, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            buf: Vec::new(),
            stats: ReadStats::default(),
            failure: None,
            done: false,
        }
    }

    /// Consume the reader, returning its counters, or the I/O error that cut
    /// the stream short.
    pub fn finish(self) -> Result<ReadStats> {
        match self.failure {
            Some(e) => Err(io::Error::new(
                e.kind(),
                format!(
                    "read failed in {} after line {}: {}",
                    self.path.display(),
                    self.stats.lines,
                    e
                ),
            )
            .into()),
            None => Ok(self.stats),
        }
    }
}

impl<R: BufRead> Iterator for TranscriptReader<R> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.stats.lines += 1;
                    let line = self.buf.trim_ascii();
                    if line.is_empty() {
                        self.stats.blank += 1;
                        continue;
                    }
                    match Event::from_slice(line) {
                        Ok(event) => {
                            self.stats.events += 1;
                            return Some(event);
                        }
                        Err(e) => {
                            self.stats.malformed += 1;
                            tracing::debug!(
                                path = %self.path.display(),
                                line = self.stats.lines,
                                error = %e,
                                "Skipping malformed transcript line"
                            );
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = self.stats.lines,
                        error = %e,
                        "Transcript read failed"
                    );
                    self.failure = Some(e);
                    self.done = true;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn reader(input: &str) -> TranscriptReader<Cursor<Vec<u8>>> {
        TranscriptReader::from_reader(
            Cursor::new(input.as_bytes().to_vec()),
            Path::new("test.jsonl"),
        )
    }

    #[test]
    fn test_malformed_lines_are_local() {
        let input = concat!(
            "{\"type\":\"session\",\"id\":\"s\"}\n",
            "{not json\n",
            "\n",
            "{\"type\":\"message\",\"message\":{\"role\":\"user\",\"content\":[\"hi\"]}}\n",
            "{\"type\":\"message\",\"message\":\"oops\"}\n",
            "{\"type\":\"custom\"}",
        );
        let mut r = reader(input);
        let events: Vec<_> = r.by_ref().collect();

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::Session(_)));
        assert!(matches!(events[1], Event::Message(_)));
        assert_eq!(events[2], Event::Other);

        let stats = r.finish().unwrap();
        assert_eq!(stats.lines, 6);
        assert_eq!(stats.blank, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.events, 3);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut bytes = b"{\"type\":\"message\",\"timestamp\":\"\xff\"}\n".to_vec();
        bytes.extend_from_slice(b"{\"type\":\"other\"}\n");
        let mut r = TranscriptReader::from_reader(Cursor::new(bytes), Path::new("bad.jsonl"));

        assert_eq!(r.next(), Some(Event::Other));
        assert_eq!(r.next(), None);
        assert_eq!(r.finish().unwrap().malformed, 1);
    }

    #[test]
    fn test_crlf_and_empty_input() {
        let mut r = reader("{\"type\":\"other\"}\r\n\r\n");
        assert_eq!(r.by_ref().count(), 1);
        assert_eq!(r.finish().unwrap().blank, 1);

        let mut r = reader("");
        assert_eq!(r.next(), None);
        assert_eq!(r.finish().unwrap(), ReadStats::default());
    }

    /// Yields one good line, then fails.
    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
            }
            self.served = true;
            let line = b"{\"type\":\"other\"}\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_io_failure_stops_stream_and_is_reported() {
        let mut r = TranscriptReader::from_reader(
            BufReader::new(FailingReader { served: false }),
            Path::new("flaky.jsonl"),
        );
        assert_eq!(r.next(), Some(Event::Other));
        assert_eq!(r.next(), None);
        // Stays exhausted
        assert_eq!(r.next(), None);

        let err = r.finish().unwrap_err();
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_open_missing_file() {
        let err = TranscriptReader::open(Path::new("/nonexistent/clawboard/x.jsonl"))
            .err()
            .expect("open should fail");
        assert!(err.to_string().contains("failed to open"));
    }
}
