//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/clawboard/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/clawboard/` (~/.config/clawboard/)
//! - State/Logs: `$XDG_STATE_HOME/clawboard/` (~/.local/state/clawboard/)
//! - Locks: `$XDG_RUNTIME_DIR/clawboard/` (falls back to the temp dir)
//!
//! Input and output locations (transcripts, workspace, dashboard API dir)
//! live under `[paths]` and default to the agent's layout in `$HOME`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Window sizes and truncation limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Skill activation checks
    #[serde(default)]
    pub skills: SkillsConfig,

    /// Workspace documents mirrored into the dashboard
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input and output locations.
///
/// Every field is optional in the file; missing entries fall back to the
/// agent's default layout under `$HOME`.
#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `<session-id>.jsonl` transcripts
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,

    /// Directory the dashboard reads its JSON artifacts from
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Agent workspace (holds MEMORY.md and the config documents)
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Directory of dated memory notes
    #[serde(default = "default_memory_dir")]
    pub memory_dir: PathBuf,

    /// Skill directories, searched in order
    #[serde(default = "default_skills_dirs")]
    pub skills_dirs: Vec<PathBuf>,

    /// Path whose filesystem is reported by the disk probe
    #[serde(default = "home_dir")]
    pub disk_probe_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            output_dir: default_output_dir(),
            workspace_dir: default_workspace_dir(),
            memory_dir: default_memory_dir(),
            skills_dirs: default_skills_dirs(),
            disk_probe_path: home_dir(),
        }
    }
}

impl PathsConfig {
    /// Point every location at subdirectories of `root`.
    ///
    /// Used by tests and by installs that keep the whole agent layout in
    /// one tree.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            sessions_dir: root.join("sessions"),
            output_dir: root.join("api"),
            workspace_dir: root.join("workspace"),
            memory_dir: root.join("workspace/memory"),
            skills_dirs: vec![root.join("workspace/skills")],
            disk_probe_path: root.to_path_buf(),
        }
    }
}

fn default_sessions_dir() -> PathBuf {
    home_dir().join(".openclaw/agents/main/sessions")
}

fn default_workspace_dir() -> PathBuf {
    home_dir().join("clawd")
}

fn default_output_dir() -> PathBuf {
    default_workspace_dir().join("dashboards/api")
}

fn default_memory_dir() -> PathBuf {
    default_workspace_dir().join("memory")
}

/// Workspace skills first, then the skills bundled with the agent package
fn default_skills_dirs() -> Vec<PathBuf> {
    vec![
        default_workspace_dir().join("skills"),
        home_dir().join(".npm-global/lib/node_modules/openclaw/skills"),
    ]
}

/// Window sizes and truncation limits for the derived views
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Entries kept in `usage.json.recentCalls`
    #[serde(default = "default_recent_calls")]
    pub recent_calls: usize,

    /// Days kept in `usage.json.byDay`
    #[serde(default = "default_usage_days")]
    pub usage_days: usize,

    /// Sessions included in `chat-history.json`
    #[serde(default = "default_history_sessions")]
    pub history_sessions: usize,

    /// Trailing messages kept per session in `chat-history.json`
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,

    /// Characters kept per chat-history message before truncation
    #[serde(default = "default_history_text_chars")]
    pub history_text_chars: usize,

    /// Characters of each memory note included as a preview
    #[serde(default = "default_memory_preview_chars")]
    pub memory_preview_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            recent_calls: default_recent_calls(),
            usage_days: default_usage_days(),
            history_sessions: default_history_sessions(),
            history_messages: default_history_messages(),
            history_text_chars: default_history_text_chars(),
            memory_preview_chars: default_memory_preview_chars(),
        }
    }
}

fn default_recent_calls() -> usize {
    50
}

fn default_usage_days() -> usize {
    14
}

fn default_history_sessions() -> usize {
    10
}

fn default_history_messages() -> usize {
    30
}

fn default_history_text_chars() -> usize {
    500
}

fn default_memory_preview_chars() -> usize {
    2000
}

/// Skill activation checks
#[derive(Debug, Deserialize)]
pub struct SkillsConfig {
    /// Skill name -> commands that must be on `PATH` for it to be active.
    /// An empty list marks a skill with no external dependencies.
    #[serde(default = "default_skill_checks")]
    pub checks: BTreeMap<String, Vec<String>>,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            checks: default_skill_checks(),
        }
    }
}

fn default_skill_checks() -> BTreeMap<String, Vec<String>> {
    let defaults: [(&str, &[&str]); 7] = [
        ("1password", &["op"]),
        ("docker", &["docker"]),
        ("github", &["gh"]),
        ("gog", &["gog"]),
        ("weather", &[]),
        ("tmux", &["tmux"]),
        ("qmd", &["qmd"]),
    ];
    defaults
        .into_iter()
        .map(|(name, cmds)| {
            (
                name.to_string(),
                cmds.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}

/// Workspace documents mirrored into `config-files.json`
#[derive(Debug, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_config_files")]
    pub config_files: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            config_files: default_config_files(),
        }
    }
}

fn default_config_files() -> Vec<String> {
    [
        "AGENTS.md",
        "SOUL.md",
        "USER.md",
        "IDENTITY.md",
        "TOOLS.md",
        "HEARTBEAT.md",
        "MEMORY.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would make a view meaningless
    pub fn validate(&self) -> Result<()> {
        if self.limits.history_text_chars == 0 {
            return Err(Error::Config(
                "limits.history_text_chars must be at least 1".to_string(),
            ));
        }
        if self.paths.skills_dirs.is_empty() {
            tracing::warn!("paths.skills_dirs is empty, skills.json will be empty");
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/clawboard/config.toml` (~/.config/clawboard/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("clawboard").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/clawboard/` (~/.local/state/clawboard/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("clawboard")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/clawboard/clawboard.log` (~/.local/state/clawboard/clawboard.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("clawboard.log")
    }

    /// Returns the directory for process lock files
    ///
    /// `$XDG_RUNTIME_DIR/clawboard/`, or the temp dir when unset.
    pub fn runtime_dir() -> PathBuf {
        let mut dir = match std::env::var_os("XDG_RUNTIME_DIR") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => std::env::temp_dir(),
        };
        dir.push("clawboard");
        dir
    }
}
