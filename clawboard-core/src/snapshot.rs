//! Snapshot writer for dashboard artifacts
//!
//! Every artifact is rewritten in full on each run. Writes go to a hidden
//! temp file in the output directory and are renamed into place, so the
//! dashboard never reads a half-written file. There is no cross-file
//! transaction: an interrupted run leaves some artifacts from the previous
//! run next to ones from the new run.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

pub const SESSIONS_INDEX: &str = "sessions-index.json";
pub const CHAT_HISTORY: &str = "chat-history.json";
pub const USAGE: &str = "usage.json";
pub const META: &str = "meta.json";
pub const MEMORY_FILES: &str = "memory-files.json";
pub const MEMORY_MAIN: &str = "memory-main.json";
pub const SKILLS: &str = "skills.json";
pub const SYSTEM: &str = "system.json";
pub const CONFIG_FILES: &str = "config-files.json";

const SESSION_PREFIX: &str = "session-";
const SESSION_SUFFIX: &str = ".json";

/// File name of the full view for one session
pub fn session_artifact(id: &str) -> String {
    format!("{SESSION_PREFIX}{id}{SESSION_SUFFIX}")
}

/// JSON layout of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Two-space indented
    Pretty,
    /// Single line
    Compact,
}

/// Writes named JSON artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the output directory if needed
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Serialize `value` and replace the artifact `name` with it.
    ///
    /// Serialization happens before the file is touched, so a value that
    /// fails to serialize leaves the previous artifact intact.
    pub fn write<T>(&self, name: &str, value: &T, layout: Layout) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let bytes = match layout {
            Layout::Pretty => serde_json::to_vec_pretty(value)?,
            Layout::Compact => serde_json::to_vec(value)?,
        };

        let path = self.path_for(name);
        let tmp = self.path_for(&format!(".{name}.tmp"));
        fs::write(&tmp, &bytes).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to write {}: {}", tmp.display(), e),
            ))
        })?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to replace {}: {}", path.display(), e),
            )));
        }

        tracing::debug!(artifact = name, bytes = bytes.len(), "Wrote artifact");
        Ok(path)
    }

    /// Read a previously written artifact; `Ok(None)` when it does not exist.
    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path_for(name);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&content)?))
    }

    /// Delete `session-<id>.json` artifacts whose id is not in `keep`.
    ///
    /// Returns the number of files removed.
    pub fn prune_sessions(&self, keep: &HashSet<String>) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(id) = name
                .strip_prefix(SESSION_PREFIX)
                .and_then(|rest| rest.strip_suffix(SESSION_SUFFIX))
            else {
                continue;
            };
            if keep.contains(id) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!(artifact = name, "Removed stale session artifact");
                }
                Err(e) => {
                    tracing::warn!(artifact = name, error = %e, "Failed to remove stale session artifact");
                }
            }
        }
        Ok(removed)
    }
}
