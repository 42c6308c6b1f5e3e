//! Run orchestration
//!
//! A run enumerates transcripts once, feeds every event to whichever
//! aggregators the requested steps need, and hands the finished views to the
//! [`SnapshotWriter`]. Collaborator steps (dashboard, config, skill status)
//! do not touch transcripts at all.
//!
//! Failures are per item: a transcript that cannot be read is skipped, an
//! artifact that cannot be written is recorded in the [`RunReport`], and the
//! run carries on with the next step.
//!
//! ```rust,no_run
//! use clawboard_core::{Config, Pipeline};
//!
//! let report = Pipeline::new(Config::load()?).run_all()?;
//! for outcome in &report.outcomes {
//!     println!("{}", outcome.summary);
//! }
//! # Ok::<(), clawboard_core::Error>(())
//! ```

use crate::aggregate::{
    chat_history, summaries, SessionAggregator, UsageAccumulator, UsageCall, UsageWindows,
};
use crate::collect::{self, CommandProbe, Skill, SkillStatus, WhichProbe};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingest::{discover_transcripts, Profile, TranscriptReader};
use crate::snapshot::{self, Layout, SnapshotWriter};
use crate::types::{generated_stamp, Meta, SessionLog};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// One unit of work in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Session index plus one full view per session
    Logs,
    /// Usage totals and rollups
    Usage,
    /// Bounded chat history over the newest sessions
    Chat,
    /// Meta, memory notes, skill list and host probes
    Dashboard,
    /// Workspace configuration documents
    Config,
    /// Activation status of the skills listed by [`Step::Dashboard`]
    SkillStatus,
}

impl Step {
    /// Every step, in the order a full run executes them
    pub const ALL: [Step; 6] = [
        Step::Logs,
        Step::Usage,
        Step::Chat,
        Step::Dashboard,
        Step::Config,
        Step::SkillStatus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Logs => "logs",
            Step::Usage => "usage",
            Step::Chat => "chat",
            Step::Dashboard => "dashboard",
            Step::Config => "config",
            Step::SkillStatus => "skill-status",
        }
    }

    fn reads_transcripts(self) -> bool {
        matches!(self, Step::Logs | Step::Usage | Step::Chat)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one step reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,
    /// One-line, user-facing summary
    pub summary: String,
    /// The step could not start (a prerequisite was missing)
    pub aborted: bool,
}

/// A per-item failure that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub step: Step,
    /// Artifact or input the failure concerns
    pub target: String,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.step, self.target, self.message)
    }
}

/// Result of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One entry per executed step, in execution order
    pub outcomes: Vec<StepOutcome>,
    pub failures: Vec<Failure>,
    /// Transcripts discovered
    pub transcripts: usize,
    /// Transcripts dropped because they could not be read to the end
    pub transcripts_skipped: usize,
    /// Lines skipped as malformed across all transcripts
    pub malformed_lines: usize,
    /// Stale `session-<id>.json` artifacts removed
    pub stale_removed: usize,
}

impl RunReport {
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.step == step)
    }

    /// True when nothing failed and no step was aborted
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.outcomes.iter().all(|o| !o.aborted)
    }
}

/// Views gathered from one pass over the transcripts.
#[derive(Debug, Default)]
struct Scan {
    logs: Vec<SessionLog>,
    history: Vec<SessionLog>,
    usage: UsageAccumulator,
    /// Ids of every transcript currently on disk, readable or not
    present: HashSet<String>,
}

/// Which aggregators a pass feeds
#[derive(Debug, Clone, Copy)]
struct Sinks {
    logs: bool,
    usage: bool,
    chat: bool,
}

/// Rebuilds the dashboard artifacts from the configured inputs.
pub struct Pipeline {
    config: Config,
    writer: SnapshotWriter,
    generated_at: Option<DateTime<Utc>>,
    probe: Box<dyn CommandProbe>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let writer = SnapshotWriter::new(&config.paths.output_dir);
        Self {
            config,
            writer,
            generated_at: None,
            probe: Box::new(WhichProbe),
        }
    }

    /// Pin the `generated` timestamp instead of reading the clock
    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Replace the command lookup used by the skill status step
    pub fn with_command_probe(mut self, probe: impl CommandProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn writer(&self) -> &SnapshotWriter {
        &self.writer
    }

    /// Run every step in order.
    pub fn run_all(&self) -> Result<RunReport> {
        self.run(&Step::ALL)
    }

    /// Run `steps` in the given order; repeated steps run once.
    ///
    /// Fails only when the output directory cannot be created.
    pub fn run(&self, steps: &[Step]) -> Result<RunReport> {
        let mut unique = Vec::with_capacity(steps.len());
        for step in steps {
            if !unique.contains(step) {
                unique.push(*step);
            }
        }

        self.writer.ensure_dir()?;
        let generated = generated_stamp(self.generated_at.unwrap_or_else(Utc::now));
        let mut report = RunReport::default();

        let sinks = Sinks {
            logs: unique.contains(&Step::Logs),
            usage: unique.contains(&Step::Usage),
            chat: unique.contains(&Step::Chat),
        };
        let mut scan = if unique.iter().any(|s| s.reads_transcripts()) {
            match self.scan(sinks, &mut report) {
                Ok(scan) => Some(scan),
                Err(e) => {
                    tracing::warn!(error = %e, "Transcript discovery failed");
                    for step in unique.iter().filter(|s| s.reads_transcripts()) {
                        report.failures.push(Failure {
                            step: *step,
                            target: self.config.paths.sessions_dir.display().to_string(),
                            message: e.to_string(),
                        });
                    }
                    None
                }
            }
        } else {
            None
        };

        for step in unique {
            let outcome = match (step, scan.as_mut()) {
                (Step::Logs, Some(scan)) => self.logs_step(scan, &mut report),
                (Step::Usage, Some(scan)) => self.usage_step(scan, &generated, &mut report),
                (Step::Chat, Some(scan)) => self.chat_step(scan, &mut report),
                (Step::Logs | Step::Usage | Step::Chat, None) => continue,
                (Step::Dashboard, _) => self.dashboard_step(&generated, &mut report),
                (Step::Config, _) => self.config_step(&mut report),
                (Step::SkillStatus, _) => self.skill_status_step(&mut report),
            };
            tracing::info!(step = %outcome.step, summary = %outcome.summary, "Step complete");
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    fn scan(&self, sinks: Sinks, report: &mut RunReport) -> Result<Scan> {
        let limits = &self.config.limits;
        let transcripts = discover_transcripts(&self.config.paths.sessions_dir)?;
        report.transcripts = transcripts.len();

        let mut scan = Scan::default();
        for (index, transcript) in transcripts.iter().enumerate() {
            scan.present.insert(transcript.id.clone());

            let mut log = sinks.logs.then(|| SessionAggregator::new(Profile::Log));
            let mut history = (sinks.chat && index < limits.history_sessions).then(|| {
                SessionAggregator::new(Profile::History {
                    max_chars: limits.history_text_chars,
                })
            });
            let mut calls = Vec::new();

            let mut reader = match TranscriptReader::open(&transcript.path) {
                Ok(reader) => reader,
                Err(e) => {
                    tracing::warn!(path = %transcript.path.display(), error = %e, "Skipping transcript");
                    report.transcripts_skipped += 1;
                    continue;
                }
            };
            for event in reader.by_ref() {
                if let Some(agg) = log.as_mut() {
                    agg.push(&event);
                }
                if let Some(agg) = history.as_mut() {
                    agg.push(&event);
                }
                if sinks.usage {
                    calls.extend(UsageCall::from_any(&event));
                }
            }

            // Nothing folded from a transcript that failed mid-read is kept
            match reader.finish() {
                Ok(stats) => {
                    report.malformed_lines += stats.malformed;
                    tracing::debug!(
                        session = %transcript.id,
                        lines = stats.lines,
                        malformed = stats.malformed,
                        "Read transcript"
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %transcript.path.display(), error = %e, "Skipping transcript");
                    report.transcripts_skipped += 1;
                    continue;
                }
            }

            if let Some(agg) = log {
                scan.logs.push(agg.finish(transcript));
            }
            if let Some(agg) = history {
                scan.history.push(agg.finish(transcript));
            }
            scan.usage.extend(&calls);
        }

        Ok(scan)
    }

    /// Write one artifact, recording a failure instead of returning it.
    fn write<T>(&self, step: Step, name: &str, value: &T, layout: Layout, report: &mut RunReport)
    where
        T: Serialize + ?Sized,
    {
        if let Err(e) = self.writer.write(name, value, layout) {
            tracing::warn!(artifact = name, error = %e, "Failed to write artifact");
            report.failures.push(Failure {
                step,
                target: name.to_string(),
                message: e.to_string(),
            });
        }
    }

    fn record_failure(&self, step: Step, target: &str, error: &Error, report: &mut RunReport) {
        tracing::warn!(target_name = target, error = %error, "Step item failed");
        report.failures.push(Failure {
            step,
            target: target.to_string(),
            message: error.to_string(),
        });
    }

    fn logs_step(&self, scan: &Scan, report: &mut RunReport) -> StepOutcome {
        let step = Step::Logs;
        for log in &scan.logs {
            self.write(
                step,
                &snapshot::session_artifact(&log.summary.id),
                log,
                Layout::Compact,
                report,
            );
        }
        self.write(
            step,
            snapshot::SESSIONS_INDEX,
            &summaries(&scan.logs),
            Layout::Pretty,
            report,
        );

        match self.writer.prune_sessions(&scan.present) {
            Ok(removed) => report.stale_removed += removed,
            Err(e) => self.record_failure(step, "stale session artifacts", &e, report),
        }

        StepOutcome {
            step,
            summary: format!("Extracted {} session logs", scan.logs.len()),
            aborted: false,
        }
    }

    fn usage_step(&self, scan: &Scan, generated: &str, report: &mut RunReport) -> StepOutcome {
        let step = Step::Usage;
        let windows = UsageWindows {
            recent_calls: self.config.limits.recent_calls,
            days: self.config.limits.usage_days,
        };
        let usage = scan.usage.report(generated.to_string(), windows);
        self.write(step, snapshot::USAGE, &usage, Layout::Pretty, report);

        StepOutcome {
            step,
            summary: format!(
                "Usage extracted: ${:.4} total, {} tokens",
                scan.usage.cost(),
                scan.usage.tokens()
            ),
            aborted: false,
        }
    }

    fn chat_step(&self, scan: &mut Scan, report: &mut RunReport) -> StepOutcome {
        let step = Step::Chat;
        let history = chat_history(
            std::mem::take(&mut scan.history),
            self.config.limits.history_messages,
        );
        self.write(step, snapshot::CHAT_HISTORY, &history, Layout::Pretty, report);

        StepOutcome {
            step,
            summary: format!("Extracted chat history from {} sessions", history.len()),
            aborted: false,
        }
    }

    fn dashboard_step(&self, generated: &str, report: &mut RunReport) -> StepOutcome {
        let step = Step::Dashboard;
        let paths = &self.config.paths;

        self.write(
            step,
            snapshot::META,
            &Meta::new(generated.to_string()),
            Layout::Compact,
            report,
        );

        let notes = match collect::memory_files(&paths.memory_dir, self.config.limits.memory_preview_chars) {
            Ok(notes) => {
                self.write(step, snapshot::MEMORY_FILES, &notes, Layout::Pretty, report);
                notes.len()
            }
            Err(e) => {
                self.record_failure(step, snapshot::MEMORY_FILES, &e, report);
                0
            }
        };

        match collect::main_memory(&paths.workspace_dir) {
            Ok(Some(content)) => {
                self.write(step, snapshot::MEMORY_MAIN, &content, Layout::Compact, report);
            }
            Ok(None) => tracing::debug!(workspace = %paths.workspace_dir.display(), "No MEMORY.md"),
            Err(e) => self.record_failure(step, snapshot::MEMORY_MAIN, &e, report),
        }

        let skills = collect::discover_skills(&paths.skills_dirs);
        self.write(step, snapshot::SKILLS, &skills, Layout::Pretty, report);

        let system = collect::probe_system(&paths.disk_probe_path);
        self.write(step, snapshot::SYSTEM, &system, Layout::Pretty, report);

        StepOutcome {
            step,
            summary: format!(
                "Dashboard data generated: {} skills, {} memory files",
                skills.len(),
                notes
            ),
            aborted: false,
        }
    }

    fn config_step(&self, report: &mut RunReport) -> StepOutcome {
        let step = Step::Config;
        let documents = collect::config_documents(
            &self.config.paths.workspace_dir,
            &self.config.workspace.config_files,
        );
        self.write(step, snapshot::CONFIG_FILES, &documents, Layout::Compact, report);

        StepOutcome {
            step,
            summary: format!("Extracted {} config files", documents.len()),
            aborted: false,
        }
    }

    fn skill_status_step(&self, report: &mut RunReport) -> StepOutcome {
        let step = Step::SkillStatus;
        let mut skills: Vec<Skill> = match self.writer.read(snapshot::SKILLS) {
            Ok(Some(skills)) => skills,
            Ok(None) => {
                let e = Error::MissingArtifact {
                    artifact: snapshot::SKILLS.to_string(),
                    hint: "run the dashboard step first".to_string(),
                };
                tracing::warn!(error = %e, "Skill status check aborted");
                return StepOutcome {
                    step,
                    summary: e.to_string(),
                    aborted: true,
                };
            }
            Err(e) => {
                self.record_failure(step, snapshot::SKILLS, &e, report);
                return StepOutcome {
                    step,
                    summary: format!("Skills not checked: {e}"),
                    aborted: true,
                };
            }
        };

        collect::apply_status(&mut skills, &self.config.skills.checks, self.probe.as_ref());
        self.write(step, snapshot::SKILLS, &skills, Layout::Pretty, report);

        let active = skills
            .iter()
            .filter(|s| s.status == Some(SkillStatus::Active))
            .count();
        StepOutcome {
            step,
            summary: format!(
                "Skills checked: {} active, {} inactive/unknown",
                active,
                skills.len() - active
            ),
            aborted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use chrono::TimeZone;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoCommands;

    impl CommandProbe for NoCommands {
        fn exists(&self, _command: &str) -> bool {
            false
        }
    }

    fn pipeline(root: &Path) -> Pipeline {
        let config = Config {
            paths: PathsConfig::rooted_at(root),
            ..Config::default()
        };
        Pipeline::new(config)
            .with_generated_at(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_command_probe(NoCommands)
    }

    fn write_transcript(root: &Path, id: &str, lines: &[&str]) {
        let dir = root.join("sessions");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{id}.jsonl")), lines.join("\n")).unwrap();
    }

    #[test]
    fn test_step_names() {
        let names: Vec<_> = Step::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec!["logs", "usage", "chat", "dashboard", "config", "skill-status"]
        );
    }

    #[test]
    fn test_usage_only_run_writes_only_usage() {
        let root = TempDir::new().unwrap();
        write_transcript(
            root.path(),
            "a",
            &[r#"{"type":"message","timestamp":"2024-01-01T00:00:00Z","message":{"role":"assistant","content":[],"usage":{"input":3,"output":4}}}"#],
        );

        let p = pipeline(root.path());
        let report = p.run(&[Step::Usage]).unwrap();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(
            report.outcomes[0].summary,
            "Usage extracted: $0.0000 total, 7 tokens"
        );
        assert!(p.writer().path_for(snapshot::USAGE).exists());
        assert!(!p.writer().path_for(snapshot::SESSIONS_INDEX).exists());
        assert!(!p.writer().path_for("session-a.json").exists());
    }

    #[test]
    fn test_repeated_steps_run_once() {
        let root = TempDir::new().unwrap();
        let report = pipeline(root.path())
            .run(&[Step::Config, Step::Config])
            .unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].summary, "Extracted 7 config files");
    }

    #[test]
    fn test_skill_status_without_skills_list_aborts() {
        let root = TempDir::new().unwrap();
        let report = pipeline(root.path()).run(&[Step::SkillStatus]).unwrap();

        let outcome = report.outcome(Step::SkillStatus).unwrap();
        assert!(outcome.aborted);
        assert_eq!(
            outcome.summary,
            "skills.json not found, run the dashboard step first"
        );
        assert!(report.failures.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_skill_status_after_dashboard() {
        let root = TempDir::new().unwrap();
        let skill_dir = root.path().join("workspace/skills/github");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), "# GitHub\n> Issues and PRs\n").unwrap();

        let p = pipeline(root.path());
        let report = p.run(&[Step::Dashboard, Step::SkillStatus]).unwrap();
        assert_eq!(
            report.outcome(Step::SkillStatus).unwrap().summary,
            "Skills checked: 0 active, 1 inactive/unknown"
        );

        let skills: Vec<Skill> = p.writer().read(snapshot::SKILLS).unwrap().unwrap();
        assert_eq!(skills[0].status, Some(SkillStatus::Inactive));
        assert_eq!(skills[0].missing, Some(vec!["gh".to_string()]));
    }

    #[test]
    fn test_malformed_lines_are_counted_not_fatal() {
        let root = TempDir::new().unwrap();
        write_transcript(
            root.path(),
            "good",
            &[
                r#"{"type":"message","message":{"role":"user","content":["hi"]}}"#,
                "{not json",
                "",
                r#"{"type":"message","message":{"role":"assistant","content":["yo"]}}"#,
            ],
        );

        let report = pipeline(root.path()).run(&[Step::Logs]).unwrap();
        assert_eq!(report.outcomes[0].summary, "Extracted 1 session logs");
        assert_eq!(report.transcripts, 1);
        assert_eq!(report.malformed_lines, 1);
        assert_eq!(report.transcripts_skipped, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_missing_sessions_dir_writes_empty_views() {
        let root = TempDir::new().unwrap();
        let p = pipeline(root.path());
        let report = p.run(&[Step::Logs, Step::Chat]).unwrap();

        assert_eq!(report.outcomes[0].summary, "Extracted 0 session logs");
        assert_eq!(
            report.outcomes[1].summary,
            "Extracted chat history from 0 sessions"
        );
        let index: Vec<serde_json::Value> =
            p.writer().read(snapshot::SESSIONS_INDEX).unwrap().unwrap();
        assert!(index.is_empty());
    }
}
