//! Ingestion layer for agent session transcripts
//!
//! Transcripts (Layer 0) are read, never written. This module finds them
//! and turns each one into a stream of typed events and normalized
//! messages that the aggregators fold.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │   Transcripts    │ ─► │ TranscriptReader │ ─► │   normalize()    │
//! │ (<id>.jsonl ...) │    │   (Event iter)   │    │ (Log / History)  │
//! └──────────────────┘    └──────────────────┘    └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clawboard_core::ingest::{discover_transcripts, TranscriptReader};
//! use std::path::Path;
//!
//! for transcript in discover_transcripts(Path::new("sessions"))? {
//!     let mut reader = TranscriptReader::open(&transcript.path)?;
//!     let events = reader.by_ref().count();
//!     let stats = reader.finish()?;
//!     println!("{}: {} events, {} malformed", transcript.id, events, stats.malformed);
//! }
//! # Ok::<(), clawboard_core::Error>(())
//! ```

pub mod normalize;
pub mod reader;
pub mod record;

pub use normalize::{extract_text, normalize, Profile, TimestampSpan};
pub use reader::{ReadStats, TranscriptReader};
pub use record::{Content, ContentBlock, ContentPart, Event, MessageBody, MessageEvent, Usage};

use crate::error::Result;
use glob::MatchOptions;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// File extension of transcripts
pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// A transcript found on disk, with the metadata the session views report.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFile {
    pub path: PathBuf,
    /// Session id: the file stem
    pub id: String,
    /// File name including extension
    pub file_name: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl TranscriptFile {
    /// Stat `path` and derive its session id.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let metadata = std::fs::metadata(&path)?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            id,
            file_name,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            path,
        })
    }

    /// Modification time as fractional seconds since the Unix epoch
    pub fn modified_secs(&self) -> f64 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// List every `*.jsonl` transcript directly inside `dir`, most recently
/// modified first.
///
/// A missing directory yields an empty list. Hidden files are ignored, and
/// files that vanish between listing and stat are skipped with a warning.
pub fn discover_transcripts(dir: &Path) -> Result<Vec<TranscriptFile>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Transcript directory not found");
        return Ok(Vec::new());
    }

    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        TRANSCRIPT_EXTENSION
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for entry in glob::glob_with(&pattern, options)?.flatten() {
        if !entry.is_file() {
            continue;
        }
        match TranscriptFile::from_path(entry.clone()) {
            Ok(file) => files.push(file),
            Err(e) => {
                tracing::warn!(path = %entry.display(), error = %e, "Failed to stat transcript");
            }
        }
    }

    // Stable sort keeps glob's name order among equal mtimes
    files.sort_by(|a, b| b.modified.cmp(&a.modified));

    tracing::debug!(dir = %dir.display(), count = files.len(), "Discovered transcripts");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, mtime_secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(mtime_secs))
            .unwrap();
    }

    #[test]
    fn test_discover_orders_by_mtime_desc() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "old.jsonl", 1_000);
        touch(dir.path(), "new.jsonl", 3_000);
        touch(dir.path(), "mid.jsonl", 2_000);
        touch(dir.path(), "notes.txt", 4_000);
        touch(dir.path(), ".hidden.jsonl", 5_000);
        std::fs::create_dir(dir.path().join("dir.jsonl")).unwrap();

        let files = discover_transcripts(dir.path()).unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
        assert_eq!(files[0].file_name, "new.jsonl");
        assert_eq!(files[0].modified_secs(), 3_000.0);
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let files = discover_transcripts(&dir.path().join("missing")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_escapes_directory_name() {
        let dir = TempDir::new().unwrap();
        let sessions = dir.path().join("agent [main]");
        std::fs::create_dir(&sessions).unwrap();
        touch(&sessions, "abc.jsonl", 10);

        let files = discover_transcripts(&sessions).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "abc");
    }

    #[test]
    fn test_transcript_file_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("6fa4cc8c.jsonl");
        std::fs::write(&path, "{}\n{}\n").unwrap();

        let file = TranscriptFile::from_path(path).unwrap();
        assert_eq!(file.id, "6fa4cc8c");
        assert_eq!(file.size, 6);
    }
}
