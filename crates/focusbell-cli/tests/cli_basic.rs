//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with HOME pointed at a fresh temp dir, so
//! config and settings never touch the real data directory.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_focusbell-cli"));
    cmd.env("HOME", home)
        .env_remove("FOCUSBELL_ENV")
        .env("RUST_LOG", "warn");
    cmd
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = cli(home)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");
    split(output)
}

fn split(output: Output) -> (String, String, i32) {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);
    (stdout, stderr, code)
}

/// Feed `lines` to `run`, keep stdin open for `linger`, then close it.
fn run_engine(home: &Path, lines: &[&str], linger: Duration) -> Vec<Value> {
    let mut child = cli(home)
        .arg("run")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn engine host");

    {
        let mut stdin = child.stdin.take().unwrap();
        for line in lines {
            writeln!(stdin, "{line}").unwrap();
        }
        stdin.flush().unwrap();
        std::thread::sleep(linger);
    }

    let (stdout, stderr, code) = split(child.wait_with_output().unwrap());
    assert_eq!(code, 0, "run failed: {stderr}");
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each stdout line is JSON"))
        .collect()
}

fn of_type<'a>(events: &'a [Value], kind: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["type"] == kind).collect()
}

#[test]
fn test_config_defaults() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "engine.tick_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "1000");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "storage.backend"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "sqlite");
}

#[test]
fn test_config_set_and_list() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "defaults.session_duration_secs", "600"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("session_duration_secs = 600"));
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "theme", "dark"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("theme"));
}

#[test]
fn test_config_rejects_unknown_backend() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "storage.backend", "redis"]);
    assert_ne!(code, 0);
}

#[test]
fn test_settings_set_then_get() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["settings", "set", "1500", "500"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(home.path(), &["settings", "get", "--json"]);
    assert_eq!(code, 0);
    let parsed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["sessionDurationSeconds"], 1500);
    assert_eq!(parsed["intervalDurationSeconds"], 500);
}

#[test]
fn test_settings_set_rejects_interval_longer_than_session() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["settings", "set", "60", "120"]);
    assert_ne!(code, 0);
}

#[test]
fn test_settings_reset_uses_config_defaults() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["settings", "set", "90", "30"]);
    let (_, _, code) = run_cli(home.path(), &["settings", "reset"]);
    assert_eq!(code, 0);

    let (stdout, _, _) = run_cli(home.path(), &["settings", "get", "--json"]);
    let parsed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["sessionDurationSeconds"], 1800);
    assert_eq!(parsed["intervalDurationSeconds"], 300);
}

#[test]
fn test_settings_with_toml_backend() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["config", "set", "storage.backend", "toml"]);
    let (_, _, code) = run_cli(home.path(), &["settings", "set", "120", "40"]);
    assert_eq!(code, 0);
    assert!(home.path().join(".config/focusbell/settings.toml").exists());
}

#[test]
fn test_run_answers_initial_settings() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["settings", "set", "90", "30"]);

    let events = run_engine(home.path(), &[r#"{"type":"GET_INITIAL_SETTINGS"}"#], Duration::ZERO);
    let settings = of_type(&events, "SETTINGS_UPDATE");
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0]["payload"]["sessionDurationSeconds"], 90);

    let states = of_type(&events, "STATE_UPDATE");
    assert_eq!(states[0]["payload"]["sessionTimeLeft"], 90);
    assert_eq!(states[0]["payload"]["intervalTimeLeft"], 30);
    assert_eq!(states[0]["payload"]["isRunning"], false);
}

#[test]
fn test_run_reports_malformed_lines() {
    let home = TempDir::new().unwrap();
    let events = run_engine(
        home.path(),
        &["not json", r#"{"type":"LAUNCH"}"#, r#"{"type":"RESET"}"#],
        Duration::ZERO,
    );
    assert_eq!(of_type(&events, "LOG").len(), 2);
    assert_eq!(of_type(&events, "STATE_UPDATE").len(), 1);
}

#[test]
fn test_run_ticks() {
    let home = TempDir::new().unwrap();
    run_cli(home.path(), &["settings", "set", "10", "3"]);

    let events = run_engine(home.path(), &[r#"{"type":"START"}"#], Duration::from_millis(2_500));
    let states = of_type(&events, "STATE_UPDATE");
    assert!(states.len() >= 3, "expected start plus two ticks: {events:?}");
    assert_eq!(states[0]["payload"]["isRunning"], true);
    assert_eq!(states[1]["payload"]["sessionTimeLeft"], 9);
    assert_eq!(states[2]["payload"]["sessionTimeLeft"], 8);
    assert_eq!(states[2]["payload"]["intervalTimeLeft"], 1);
}
