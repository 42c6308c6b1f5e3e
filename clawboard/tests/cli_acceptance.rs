use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    base: PathBuf,
    home: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
    xdg_runtime: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");
        let xdg_runtime = base.join("xdg-runtime");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");
        fs::create_dir_all(&xdg_runtime).expect("failed to create XDG_RUNTIME_DIR");

        Self {
            _temp_dir: temp_dir,
            base,
            home,
            xdg_config,
            xdg_state,
            xdg_runtime,
        }
    }

    /// Seed an agent tree under `root` and write a config file pointing at it.
    fn seed_with_config(&self) -> PathBuf {
        let root = self.base.join("agent");
        copy_tree(&fixture_dir("sessions"), &root.join("sessions"));
        copy_tree(&fixture_dir("workspace"), &root.join("workspace"));

        let config = format!(
            r#"
[paths]
sessions_dir = "{root}/sessions"
output_dir = "{root}/api"
workspace_dir = "{root}/workspace"
memory_dir = "{root}/workspace/memory"
skills_dirs = ["{root}/workspace/skills"]
disk_probe_path = "{root}"

[skills.checks]
github = []
weather = []
"#,
            root = root.display()
        );
        let path = self.base.join("clawboard.toml");
        fs::write(&path, config).expect("failed to write config");
        path
    }

    fn api_dir(&self) -> PathBuf {
        self.base.join("agent/api")
    }
}

fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../clawboard-core/tests/fixtures")
        .join(name)
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("failed to create fixture directory");
    for entry in fs::read_dir(from).expect("failed to read fixture directory") {
        let entry = entry.expect("failed to read fixture entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("failed to copy fixture");
        }
    }
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("clawboard"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .env("XDG_RUNTIME_DIR", &env.xdg_runtime)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to execute clawboard: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "clawboard {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn read_json(path: &Path) -> serde_json::Value {
    let content = fs::read(path).unwrap_or_else(|e| panic!("missing {}: {e}", path.display()));
    serde_json::from_slice(&content).expect("artifact is not valid JSON")
}

#[test]
fn full_run_writes_every_artifact_and_prints_summaries() {
    let env = CliTestEnv::new();
    let config = env.seed_with_config();
    let config = config.to_string_lossy().into_owned();
    let args = ["--config", config.as_str()];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines[0], "Extracted 2 session logs");
    assert_eq!(lines[1], "Usage extracted: $0.0170 total, 167 tokens");
    assert_eq!(lines[2], "Extracted chat history from 2 sessions");
    assert!(lines[3].starts_with("Dashboard data generated: 2 skills"));
    assert_eq!(lines[4], "Extracted 7 config files");
    assert_eq!(lines[5], "Skills checked: 2 active, 0 inactive/unknown");

    for name in [
        "sessions-index.json",
        "session-noisy.json",
        "session-scenario-a.json",
        "chat-history.json",
        "usage.json",
        "meta.json",
        "memory-files.json",
        "memory-main.json",
        "skills.json",
        "system.json",
        "config-files.json",
    ] {
        assert!(
            env.api_dir().join(name).exists(),
            "expected artifact {name} in {}",
            env.api_dir().display()
        );
    }

    let session = read_json(&env.api_dir().join("session-scenario-a.json"));
    assert_eq!(session["messageCount"], 2);
    assert_eq!(session["firstMessage"], "2024-05-01T00:00:00Z");
    assert_eq!(session["lastMessage"], "2024-05-01T00:00:02Z");

    let log_dir = env.xdg_state.join("clawboard");
    assert!(
        fs::read_dir(&log_dir).map(|mut d| d.next().is_some()).unwrap_or(false),
        "expected a log file in {}",
        log_dir.display()
    );
}

#[test]
fn skills_step_without_skill_list_reports_and_succeeds() {
    let env = CliTestEnv::new();
    let config = env.seed_with_config();
    let config = config.to_string_lossy().into_owned();
    let args = ["--config", config.as_str(), "skills"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        "skills.json not found, run the dashboard step first"
    );
    assert!(!env.api_dir().join("skills.json").exists());
}

#[test]
fn single_step_writes_only_its_artifacts() {
    let env = CliTestEnv::new();
    let config = env.seed_with_config();
    let config = config.to_string_lossy().into_owned();
    let args = ["--config", config.as_str(), "usage"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let usage = read_json(&env.api_dir().join("usage.json"));
    assert_eq!(usage["totals"]["inputTokens"], 130);
    assert!(usage["generated"].as_str().unwrap().ends_with('Z'));
    assert!(!env.api_dir().join("sessions-index.json").exists());
    assert!(!env.api_dir().join("meta.json").exists());
}

#[test]
fn default_config_uses_agent_layout_under_home() {
    let env = CliTestEnv::new();
    copy_tree(
        &fixture_dir("sessions"),
        &env.home.join(".openclaw/agents/main/sessions"),
    );

    let args = ["logs"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "Extracted 2 session logs");
    let index = read_json(&env.home.join("clawd/dashboards/api/sessions-index.json"));
    assert_eq!(index.as_array().unwrap().len(), 2);
}

#[test]
fn missing_sessions_directory_is_not_fatal() {
    let env = CliTestEnv::new();
    let args = ["logs"];

    let output = run_bin(&env, &args);
    assert_success(&args, &output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Extracted 0 session logs"
    );
}

#[test]
fn invalid_config_file_fails() {
    let env = CliTestEnv::new();
    let path = env.base.join("broken.toml");
    fs::write(&path, "[limits]\nhistory_text_chars = 0\n").expect("failed to write config");
    let path = path.to_string_lossy().into_owned();

    let output = run_bin(&env, &["--config", path.as_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to load configuration"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn unknown_step_is_rejected() {
    let env = CliTestEnv::new();
    let output = run_bin(&env, &["everything"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid value"));
}
