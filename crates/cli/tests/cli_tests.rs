//! CLI integration tests

use std::process::Command;

fn psctl(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_psctl"))
        .args(args)
        .env_remove("PSCTL_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = psctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("CI/CD Performance Suite"),
        "Should show app name"
    );
    assert!(stdout.contains("runs"), "Should show runs command");
    assert!(
        stdout.contains("recommendations"),
        "Should show recommendations command"
    );
    assert!(stdout.contains("savings"), "Should show savings command");
    assert!(stdout.contains("health"), "Should show health command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = psctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("psctl"), "Should show binary name");
}

/// Test runs start subcommand help
#[test]
fn test_runs_start_help() {
    let output = psctl(&["runs", "start", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Runs start help should succeed");
    assert!(stdout.contains("--name"), "Should show name option");
    assert!(stdout.contains("--users"), "Should show users option");
    assert!(stdout.contains("--duration"), "Should show duration option");
}

/// Test runs stop subcommand help
#[test]
fn test_runs_stop_help() {
    let output = psctl(&["runs", "stop", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Runs stop help should succeed");
    assert!(stdout.contains("--id"), "Should show id option");
}

/// Test runs ingest subcommand help
#[test]
fn test_runs_ingest_help() {
    let output = psctl(&["runs", "ingest", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Runs ingest help should succeed");
    assert!(stdout.contains("--latency-ms"), "Should show latency option");
    assert!(stdout.contains("--failed"), "Should show failed flag");
}

/// Test recommendations subcommand help
#[test]
fn test_recommendations_help() {
    let output = psctl(&["recommendations", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        output.status.success(),
        "Recommendations help should succeed"
    );
    assert!(
        stdout.contains("--namespace"),
        "Should show namespace option"
    );
}

/// Test format and api-url options
#[test]
fn test_global_options() {
    let output = psctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("PSCTL_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = psctl(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = psctl(&["runs", "start", "--name", "smoke"]);

    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

/// Test that an unreachable backend fails with a message instead of a panic
#[test]
fn test_unreachable_backend() {
    let output = psctl(&["--api-url", "http://127.0.0.1:9", "runs", "list"]);

    assert!(!output.status.success(), "Unreachable backend should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to send request"),
        "Should explain the request failure"
    );
}
