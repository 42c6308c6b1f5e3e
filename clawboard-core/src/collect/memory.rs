//! Memory note snapshots

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Long-term memory document at the workspace root
pub const MAIN_MEMORY_FILE: &str = "MEMORY.md";

/// One entry of `memory-files.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFile {
    pub name: String,
    pub size: u64,
    /// Whole seconds since the Unix epoch
    pub modified: i64,
    /// Leading characters of the note
    pub preview: String,
}

/// List the `*.md` notes in `dir`, newest name first (notes are date-named).
///
/// Unreadable notes are logged and left out. A missing directory yields an
/// empty list.
pub fn memory_files(dir: &Path, preview_chars: usize) -> Result<Vec<MemoryFile>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "Memory directory not found");
        return Ok(Vec::new());
    }

    let pattern = format!("{}/*.md", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut paths: Vec<_> = glob::glob(&pattern)?.flatten().collect();
    paths.sort_by(|a, b| b.cmp(a));

    let mut files = Vec::new();
    for path in paths {
        match read_note(&path, preview_chars) {
            Ok(file) => files.push(file),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to read memory note"),
        }
    }
    Ok(files)
}

fn read_note(path: &Path, preview_chars: usize) -> Result<MemoryFile> {
    let metadata = std::fs::metadata(path)?;
    let content = std::fs::read_to_string(path)?;
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Ok(MemoryFile {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        modified,
        preview: content.chars().take(preview_chars).collect(),
    })
}

/// Content of the workspace `MEMORY.md`, if present.
pub fn main_memory(workspace: &Path) -> Result<Option<String>> {
    let path = workspace.join(MAIN_MEMORY_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}
