//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temp dir so the
//! config file never touches the real one.

use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_grappletimer"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("GRAPPLETIMER_ENV")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_config_get_defaults() {
    let home = home();
    let (code, stdout, _) = run_cli(&home, &["config", "get", "timer.rounds"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5");

    let (code, stdout, _) = run_cli(&home, &["config", "get", "timer.round_duration"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "5m");
}

#[test]
fn test_config_set_persists() {
    let home = home();
    let (code, _, _) = run_cli(&home, &["config", "set", "timer.rest_duration", "45s"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(&home, &["config", "get", "timer.rest_duration"]);
    assert_eq!(stdout.trim(), "45s");

    let (code, _, _) = run_cli(&home, &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(&home, &["config", "get", "timer.rest_duration"]);
    assert_eq!(stdout.trim(), "1m");
}

#[test]
fn test_config_rejects_bad_input() {
    let home = home();
    let (code, _, stderr) = run_cli(&home, &["config", "set", "timer.clapper_offset", "10m"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));

    let (code, _, _) = run_cli(&home, &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_path_is_under_home() {
    let home = home();
    let (code, stdout, _) = run_cli(&home, &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with(".config/grappletimer/config.toml"));
}

#[test]
fn test_preset_lifecycle() {
    let home = home();
    let (code, stdout, _) = run_cli(&home, &["preset", "list", "--json"]);
    assert_eq!(code, 0);
    let presets: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(presets.as_array().unwrap().len(), 3);

    let (code, _, _) = run_cli(
        &home,
        &["preset", "add", "--name", "Drills", "--round", "2m", "--rest", "30s", "--rounds", "8"],
    );
    assert_eq!(code, 0);
    let (code, _, _) = run_cli(&home, &["preset", "select", "drills"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(&home, &["config", "get", "timer.rounds"]);
    assert_eq!(stdout.trim(), "8");

    let (code, _, _) = run_cli(&home, &["preset", "add", "--name", "Drills"]);
    assert_eq!(code, 1);
    let (code, _, _) = run_cli(&home, &["preset", "remove", "Drills"]);
    assert_eq!(code, 0);
    let (code, _, _) = run_cli(&home, &["preset", "select", "Drills"]);
    assert_eq!(code, 1);
}

#[test]
fn test_plan_json() {
    let home = home();
    let (code, stdout, _) = run_cli(
        &home,
        &["plan", "--json", "--round", "5s", "--rest", "3s", "--rounds", "2", "--clapper", "1s"],
    );
    assert_eq!(code, 0);
    let plan: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(plan["total_duration_ms"], 13_000);
    assert_eq!(plan["timeline"].as_array().unwrap().len(), 4);
    assert_eq!(plan["notifications"].as_array().unwrap().len(), 4);
    assert_eq!(plan["notifications"][3]["title"], "Session Complete!");
}

#[test]
fn test_plan_rejects_invalid_configuration() {
    let home = home();
    let (code, _, stderr) = run_cli(&home, &["plan", "--rounds", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("rounds"));
}

#[test]
fn test_run_json_short_session() {
    let home = home();
    let (code, stdout, _) = run_cli(
        &home,
        &["run", "--json", "--round", "2s", "--rest", "1s", "--rounds", "1", "--clapper", "1s"],
    );
    assert_eq!(code, 0);

    let types: Vec<String> = stdout
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        types,
        vec![
            "session_started",
            "phase_changed",
            "clapper",
            "phase_changed",
            "phase_changed",
        ]
    );
}

#[test]
fn test_completions() {
    let home = home();
    let (code, stdout, _) = run_cli(&home, &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("grappletimer"));
}

#[cfg(unix)]
#[test]
fn test_run_stops_cleanly_on_interrupt() {
    use std::io::{BufRead, BufReader};

    let home = home();
    let mut child = Command::new(env!("CARGO_BIN_EXE_grappletimer"))
        .args(["run", "--json", "--round", "1m", "--rounds", "3"])
        .env("HOME", home.path())
        .env_remove("GRAPPLETIMER_ENV")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut first = String::new();
    stdout.read_line(&mut first).unwrap();
    assert!(first.contains("session_started"));

    // Let the run loop settle into waiting on every branch.
    std::thread::sleep(std::time::Duration::from_millis(500));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let rest: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
        .collect();
    assert_eq!(child.wait().unwrap().code(), Some(0));

    let last = rest.last().unwrap();
    assert_eq!(last["type"], "phase_changed");
    assert_eq!(last["new"]["kind"], "idle");
    assert_eq!(last["old"]["kind"], "work");
}
