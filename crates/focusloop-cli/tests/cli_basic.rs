//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with HOME pointed at a fresh temporary
//! directory, so the database and config start empty.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusloop"))
        .args(args)
        .env("HOME", home)
        .env_remove("FOCUSLOOP_ENV")
        .env_remove("FOCUSLOOP_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let (code, stdout, stderr) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_status_when_idle() {
    let home = tempfile::tempdir().unwrap();
    let status = run_json(home.path(), &["status"]);
    assert!(status["active_session"].is_null());
    assert_eq!(status["today"]["work_sessions"], 0);
}

#[test]
fn test_session_lifecycle() {
    let home = tempfile::tempdir().unwrap();
    let started = run_json(home.path(), &["start", "--minutes", "30", "--no-git", "--tag", "docs"]);
    assert_eq!(started["status"], "running");
    assert_eq!(started["planned_ms"], 30 * 60_000);

    let (code, _, stderr) = run_cli(home.path(), &["start", "--no-git"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    assert_eq!(run_json(home.path(), &["pause"])["status"], "paused");
    assert_eq!(run_json(home.path(), &["resume"])["status"], "running");

    let status = run_json(home.path(), &["status"]);
    assert_eq!(status["active_session"]["id"], started["id"]);
    assert!(status["remaining_ms"].as_i64().unwrap() > 0);

    assert_eq!(run_json(home.path(), &["stop"])["status"], "completed");
    let today = run_json(home.path(), &["stats", "today"]);
    assert_eq!(today["work_sessions"], 1);
}

#[test]
fn test_pause_without_session_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["pause"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_break_after_work() {
    let home = tempfile::tempdir().unwrap();
    run_json(home.path(), &["start", "-m", "deep-work", "--no-git"]);
    run_json(home.path(), &["stop"]);
    let brk = run_json(home.path(), &["break", "-m", "deep-work"]);
    assert_eq!(brk["kind"], "short_break");
    assert_eq!(brk["planned_ms"], 20 * 60_000);
}

#[test]
fn test_annotations_target_last_session() {
    let home = tempfile::tempdir().unwrap();
    let started = run_json(home.path(), &["start", "-m", "make-time", "--no-git"]);
    run_json(home.path(), &["distraction", "chat", "--category", "external"]);
    run_json(home.path(), &["stop"]);

    let scored = run_json(home.path(), &["score", "4"]);
    assert_eq!(scored["id"], started["id"]);
    assert_eq!(scored["focus_score"], 4);

    let energized = run_json(home.path(), &["energize", "walk"]);
    assert_eq!(energized["energize_activity"], "walk");
    assert_eq!(energized["distractions"][0]["category"], "external");

    let (code, _, _) = run_cli(home.path(), &["score", "9"]);
    assert_eq!(code, 1);
}

#[test]
fn test_task_add_and_highlight() {
    let home = tempfile::tempdir().unwrap();
    let task = run_json(home.path(), &["task", "add", "Write report #writing", "--highlight"]);
    assert_eq!(task["title"], "Write report");
    assert_eq!(task["tags"][0], "writing");

    let candidate = run_json(home.path(), &["task", "highlight"]);
    assert_eq!(candidate["source"], "today");
    assert_eq!(candidate["task"]["id"], task["id"]);

    let id = task["id"].as_str().unwrap();
    let session = run_json(home.path(), &["start", "--task", id, "--no-git"]);
    assert_eq!(session["task_id"], task["id"]);

    let tasks = run_json(home.path(), &["task", "list"]);
    assert_eq!(tasks[0]["status"], "in_progress");
}

#[test]
fn test_config_get_set() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "methodology"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "pomodoro");

    let (code, _, _) = run_cli(home.path(), &["config", "set", "methodology", "deep_work"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "methodology"]);
    assert_eq!(stdout.trim(), "deep_work");

    let (code, _, _) = run_cli(home.path(), &["config", "set", "methodology", "kanban"]);
    assert_eq!(code, 1);
    let (code, _, _) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_stats_commands() {
    let home = tempfile::tempdir().unwrap();
    let streak = run_json(home.path(), &["stats", "streak"]);
    assert_eq!(streak["days"], 0);
    assert_eq!(streak["threshold_minutes"], 60);

    let hourly = run_json(home.path(), &["stats", "hourly"]);
    assert_eq!(hourly["work_ms_by_hour"].as_object().unwrap().len(), 24);

    let period = run_json(home.path(), &["stats", "period", "--days", "7"]);
    assert_eq!(period["total_sessions"], 0);
    assert!(run_json(home.path(), &["stats", "energize"]).as_array().unwrap().is_empty());
}

#[test]
fn test_stats_accept_huge_day_counts() {
    let home = tempfile::tempdir().unwrap();
    for command in ["period", "hourly", "energize"] {
        let (code, _, stderr) = run_cli(home.path(), &["stats", command, "--days", "4000000000"]);
        assert_eq!(code, 0, "stats {command} failed: {stderr}");
    }
}
