//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run with HOME pointed at a scratch
//! directory, so nothing touches the real user config.

use std::path::{Path, PathBuf};
use std::process::Command;

fn scratch_home(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("clarion-cli-test-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("failed to create scratch home");
    dir
}

fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "clarion-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env("CLARION_ENV", "dev")
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn config_list_prints_defaults() {
    let home = scratch_home("config-list");
    let (code, stdout, _) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("config list not JSON");
    assert_eq!(parsed["snooze_minutes"], 9);
    assert_eq!(parsed["fade"]["steps"], 20);
}

#[test]
fn config_get_and_set_round_trip() {
    let home = scratch_home("config-set");
    let (code, _, _) = run_cli(&home, &["config", "set", "snooze_minutes", "5"]);
    assert_eq!(code, 0);
    let (code, stdout, _) = run_cli(&home, &["config", "get", "snooze_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");
}

#[test]
fn config_get_unknown_key_fails() {
    let home = scratch_home("config-unknown");
    let (code, _, _) = run_cli(&home, &["config", "get", "does_not_exist"]);
    assert_ne!(code, 0);
}

#[test]
fn alarm_add_then_list_shows_it() {
    let home = scratch_home("alarm-add");
    let (code, stdout, stderr) = run_cli(
        &home,
        &[
            "alarm", "add", "7:30", "--label", "workout", "--sound", "chime.ogg", "--repeat",
            "weekdays",
        ],
    );
    assert_eq!(code, 0, "add failed: {stderr}");
    assert!(stdout.starts_with("added "));

    let (code, stdout, _) = run_cli(&home, &["alarm", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("07:30"));
    assert!(stdout.contains("workout"));
    assert!(stdout.contains("weekdays"));
}

#[test]
fn alarm_list_json_is_parseable() {
    let home = scratch_home("alarm-json");
    run_cli(&home, &["alarm", "add", "6:00", "--sound", "bell.ogg"]);
    let (code, stdout, _) = run_cli(&home, &["alarm", "list", "--json"]);
    assert_eq!(code, 0);
    let alarms: serde_json::Value = serde_json::from_str(&stdout).expect("list not JSON");
    let alarms = alarms.as_array().expect("list not an array");
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0]["hour"], 6);
    assert_eq!(alarms[0]["recurrence"]["type"], "once");
}

#[test]
fn alarm_add_rejects_bad_time() {
    let home = scratch_home("alarm-bad-time");
    let (code, _, stderr) = run_cli(&home, &["alarm", "add", "25:00", "--sound", "x.ogg"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn alarm_commands_reject_unknown_id() {
    let home = scratch_home("alarm-unknown");
    let ghost = "00000000-0000-4000-8000-000000000000";
    let (code, _, stderr) = run_cli(&home, &["alarm", "snooze", ghost]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}
