//! Skill discovery and activation status
//!
//! A skill is a directory holding a `SKILL.md`:
//!
//! ```markdown
//! # Weather
//! > Current conditions and forecasts
//! > for any location.
//! ```
//!
//! The first `# ` line is the title; the first `> ` line starts the
//! description and later `>` lines continue it. Without a quoted
//! description, the first plain line after the title is used.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// File that marks a directory as a skill
pub const SKILL_FILE: &str = "SKILL.md";

/// Activation state written by the status check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Active,
    Inactive,
    Unknown,
}

/// One entry of `skills.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub title: String,
    pub description: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SkillStatus>,
    /// Commands a skill needs that are not installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

/// Extract `(title, description)` from SKILL.md content.
pub fn parse_skill_md(content: &str) -> (String, String) {
    let mut title = String::new();
    let mut description = String::new();

    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("# ").filter(|_| title.is_empty()) {
            title = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("> ").filter(|_| description.is_empty()) {
            description = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix('>').filter(|_| !description.is_empty()) {
            description.push(' ');
            description.push_str(rest.trim());
        }
    }

    if description.is_empty() {
        description = first_paragraph_line(content).unwrap_or_default();
    }

    (title, description)
}

/// First non-heading, non-rule line after the first `# ` heading
fn first_paragraph_line(content: &str) -> Option<String> {
    let mut in_content = false;
    for line in content.lines() {
        if line.starts_with("# ") {
            in_content = true;
            continue;
        }
        let trimmed = line.trim();
        if in_content && !trimmed.is_empty() && !line.starts_with('#') && !line.starts_with("---")
        {
            return Some(trimmed.to_string());
        }
    }
    None
}

/// Scan skill directories in order and build the sorted skill list.
///
/// A skill found again in a later directory only replaces the earlier entry
/// when the earlier one has no description. Missing directories are skipped.
pub fn discover_skills(dirs: &[PathBuf]) -> Vec<Skill> {
    let mut skills: BTreeMap<String, Skill> = BTreeMap::new();

    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Skipping skills directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let skill_dir = entry.path();
            let skill_file = skill_dir.join(SKILL_FILE);
            if !skill_dir.is_dir() || !skill_file.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if skills
                .get(&name)
                .is_some_and(|existing| !existing.description.is_empty())
            {
                continue;
            }

            match read_skill(&name, &skill_file) {
                Ok(skill) => {
                    skills.insert(name, skill);
                }
                Err(e) => {
                    tracing::warn!(path = %skill_file.display(), error = %e, "Failed to read skill");
                }
            }
        }
    }

    skills.into_values().collect()
}

fn read_skill(name: &str, skill_file: &Path) -> Result<Skill> {
    let content = std::fs::read_to_string(skill_file)?;
    let (title, description) = parse_skill_md(&content);

    Ok(Skill {
        name: name.to_string(),
        title: if title.is_empty() {
            name.to_string()
        } else {
            title
        },
        description,
        path: skill_file.to_string_lossy().into_owned(),
        status: None,
        missing: None,
    })
}

/// Answers whether a command is installed.
pub trait CommandProbe {
    fn exists(&self, command: &str) -> bool;
}

/// Probe that asks `which`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichProbe;

impl CommandProbe for WhichProbe {
    fn exists(&self, command: &str) -> bool {
        Command::new("which")
            .arg(command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Set `status` (and `missing`) on every skill.
///
/// Skills with a configured check are `active` when every listed command
/// exists (or the list is empty), otherwise `inactive` with the absent
/// commands in `missing`. Other skills are `active` when a command with the
/// skill's own name exists, otherwise `unknown`.
pub fn apply_status(
    skills: &mut [Skill],
    checks: &BTreeMap<String, Vec<String>>,
    probe: &dyn CommandProbe,
) {
    // Several skills can share a command; ask once per run
    let mut seen: HashMap<String, bool> = HashMap::new();
    let mut exists = |cmd: &str| -> bool {
        *seen
            .entry(cmd.to_string())
            .or_insert_with(|| probe.exists(cmd))
    };

    for skill in skills.iter_mut() {
        skill.missing = None;
        skill.status = Some(match checks.get(&skill.name) {
            Some(cmds) => {
                let missing: Vec<String> =
                    cmds.iter().filter(|c| !exists(c.as_str())).cloned().collect();
                if missing.is_empty() {
                    SkillStatus::Active
                } else {
                    skill.missing = Some(missing);
                    SkillStatus::Inactive
                }
            }
            None if exists(skill.name.as_str()) => SkillStatus::Active,
            None => SkillStatus::Unknown,
        });
    }
}
