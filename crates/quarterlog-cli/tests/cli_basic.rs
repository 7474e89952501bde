//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with an isolated config directory and
//! working directory, and verify outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_quarterlog"));
    cmd.current_dir(home)
        .env("QUARTERLOG_CONFIG_DIR", home.join("config"))
        .env_remove("QUARTERLOG_LOG");
    cmd
}

/// Run a CLI command and return (stdout, stderr, code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = cli(home)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// Keep sessions quiet and local: no desktop notifications, no git.
fn quiet(home: &Path) {
    run_ok(home, &["config", "set", "notifications.enabled", "false"]);
    run_ok(home, &["config", "set", "publish.enabled", "false"]);
}

fn session_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let stdout = run_ok(home.path(), &["--help"]);
    for command in ["start", "folders", "alert", "config", "completions"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_config_defaults_and_set() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(home.path(), &["config", "get", "timer.interval_secs"]).trim(), "900");
    assert_eq!(run_ok(home.path(), &["config", "get", "timer.capture_secs"]).trim(), "50");
    assert!(home.path().join("config").join("config.toml").exists());

    run_ok(home.path(), &["config", "set", "alerts.volume", "35"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "alerts.volume"]).trim(), "35");

    let list: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["config", "list"])).unwrap();
    assert_eq!(list["alerts"]["volume"], 35);

    run_ok(home.path(), &["config", "reset"]);
    assert_eq!(run_ok(home.path(), &["config", "get", "alerts.volume"]).trim(), "70");
}

#[test]
fn test_config_rejects_bad_input() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "nope.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));

    let (_, _, code) = run_cli(home.path(), &["config", "set", "timer.capture_secs", "0"]);
    assert_eq!(code, 1);
    assert_eq!(run_ok(home.path(), &["config", "get", "timer.capture_secs"]).trim(), "50");
}

#[test]
fn test_folders_create_and_list() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(home.path(), &["folders", "create", "side project"]).trim(), "side_project");
    run_ok(home.path(), &["folders", "create", "alpha"]);

    let rows: serde_json::Value =
        serde_json::from_str(&run_ok(home.path(), &["folders", "list", "--json"])).unwrap();
    let names: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "side_project"]);
    assert_eq!(rows[0]["sessions"], 0);
    assert!(home.path().join("work_sessions").join("alpha").is_dir());
}

#[test]
fn test_permission_revoke_is_remembered() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_ok(home.path(), &["alert", "permission"]).trim(), "default");
    assert_eq!(run_ok(home.path(), &["alert", "revoke"]).trim(), "denied");
    assert_eq!(run_ok(home.path(), &["alert", "permission"]).trim(), "denied");
}

#[test]
fn test_session_end_saves_report() {
    let home = tempfile::tempdir().unwrap();
    quiet(home.path());

    let mut child = cli(home.path())
        .args(["start", "--title", "Write tests", "--folder", "proj", "--description", ""])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b":status\n:end\ny\n").unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    assert!(stdout.contains("Interval 1 | running"));
    assert!(stdout.contains("# Work Session #1 - Write tests"));
    assert!(stdout.contains("*No logs recorded during this session.*"));
    assert!(stdout.contains("Publishing skipped."));

    let dir = home.path().join("work_sessions").join("proj");
    let files = session_files(&dir);
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("session_1_"));
    let saved = std::fs::read_to_string(dir.join(&files[0])).unwrap();
    assert!(saved.contains("**Description:** No description provided"));
}

#[test]
fn test_declining_end_keeps_session_running() {
    let home = tempfile::tempdir().unwrap();
    quiet(home.path());

    let mut child = cli(home.path())
        .args(["start", "--title", "t", "--folder", "proj", "--description", "d", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b":end\nn\n:status\n:end\ny\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let events: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("every stdout line is JSON"))
        .collect();
    let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["session_started", "state_snapshot", "session_ended", "close_stage", "session_saved"]
    );
    assert_eq!(events[0]["session"]["number"], 1);
    assert_eq!(events[4]["outcome"]["publish"], serde_json::Value::Null);
}

#[test]
fn test_capture_saves_typed_log() {
    let home = tempfile::tempdir().unwrap();
    quiet(home.path());
    run_ok(home.path(), &["config", "set", "timer.interval_secs", "1"]);
    run_ok(home.path(), &["config", "set", "timer.capture_secs", "30"]);
    run_ok(home.path(), &["config", "set", "timer.tick_millis", "100"]);

    let mut child = cli(home.path())
        .args(["start", "--title", "Short", "--folder", "quick", "--description", "d", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    std::thread::sleep(Duration::from_millis(2500));
    stdin.write_all(b"wrote the capture test\n").unwrap();
    stdin.write_all(b":end\ny\n").unwrap();
    drop(stdin);
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"type\":\"boundary_reached\""));
    assert!(stdout.contains("\"content\":\"wrote the capture test\""));

    let dir = home.path().join("work_sessions").join("quick");
    let files = session_files(&dir);
    let saved = std::fs::read_to_string(dir.join(&files[0])).unwrap();
    assert!(saved.contains("### Interval 1 - "));
    assert!(saved.contains("wrote the capture test"));
}
