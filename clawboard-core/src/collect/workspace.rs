//! Workspace configuration documents
//!
//! The agent's persona and operating notes live as markdown files at the
//! workspace root. They are mirrored verbatim; a missing or unreadable file
//! is reported in place of its content so the dashboard can show why.

use std::collections::BTreeMap;
use std::path::Path;

/// Map each configured file name to its content or a diagnostic string.
pub fn config_documents(workspace: &Path, names: &[String]) -> BTreeMap<String, String> {
    names
        .iter()
        .map(|name| {
            let path = workspace.join(name);
            let content = if path.exists() {
                std::fs::read_to_string(&path).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read config document");
                    format!("Error reading file: {e}")
                })
            } else {
                format!("File not found: {}", path.display())
            };
            (name.clone(), content)
        })
        .collect()
}
