//! Integration tests for the `passvault` CLI binary.
//!
//! These tests run the CLI as a subprocess and check exit codes, output and
//! session-file side effects. None of them needs a reachable vault server:
//! commands that would contact one are expected to stop earlier.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Command;

fn passvault_bin() -> String {
    let path = env!("CARGO_BIN_EXE_passvault");
    assert!(
        Path::new(path).exists(),
        "passvault binary not found at {path}"
    );
    path.to_owned()
}

/// A command with every `PASSVAULT_*` variable cleared and the session file
/// pointed into `dir`.
fn command(dir: &Path) -> Command {
    let mut cmd = Command::new(passvault_bin());
    for var in [
        "PASSVAULT_API_URL",
        "PASSVAULT_ENCRYPTION_KEY",
        "PASSVAULT_TOKEN",
        "PASSVAULT_LOG_LEVEL",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("PASSVAULT_SESSION_FILE", dir.join("session.json"));
    cmd
}

/// Run passvault with args and return (`exit_code`, stdout, stderr).
fn run_in(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> (i32, String, String) {
    let mut cmd = command(dir);
    cmd.args(args);
    for (k, v) in env {
        cmd.env(k, v);
    }
    let output = cmd.output().expect("failed to execute passvault");
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

fn run(args: &[&str]) -> (i32, String, String) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    run_in(dir.path(), args, &[])
}

/// Config pointing at a port nothing listens on.
const OFFLINE: [(&str, &str); 2] = [
    ("PASSVAULT_API_URL", "http://127.0.0.1:19999/api"),
    ("PASSVAULT_ENCRYPTION_KEY", "cli-test-secret"),
];

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let (code, stdout, _) = run(&["--version"]);
    assert_eq!(code, 0, "passvault --version should exit 0");
    assert!(stdout.contains("passvault"), "version output: {stdout}");
}

#[test]
fn test_help_lists_commands() {
    let (code, stdout, _) = run(&["--help"]);
    assert_eq!(code, 0);
    for sub in ["list", "add", "edit", "delete", "copy", "generate", "session"] {
        assert!(stdout.contains(sub), "help should list '{sub}': {stdout}");
    }
}

#[test]
fn test_subcommand_help() {
    for sub in ["list", "add", "edit", "delete", "copy", "generate", "session"] {
        let (code, stdout, _) = run(&[sub, "--help"]);
        assert_eq!(code, 0, "{sub} --help should exit 0");
        assert!(!stdout.is_empty(), "{sub} --help should produce output");
    }
}

// ── Generate (no server needed) ──────────────────────────────────────

#[test]
fn test_generate_default_length() {
    let (code, stdout, stderr) = run(&["generate"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(stdout.trim().chars().count(), 12);
}

#[test]
fn test_generate_lowercase_only() {
    let (code, stdout, _) = run(&[
        "generate",
        "--length",
        "20",
        "--no-uppercase",
        "--no-numbers",
        "--no-symbols",
    ]);
    assert_eq!(code, 0);
    let password = stdout.trim();
    assert_eq!(password.len(), 20);
    assert!(
        password.chars().all(|c| c.is_ascii_lowercase()),
        "expected lowercase only: {password}"
    );
}

#[test]
fn test_generate_rejects_out_of_range_length() {
    for length in ["5", "33"] {
        let (code, _, stderr) = run(&["generate", "--length", length]);
        assert_ne!(code, 0, "length {length} should be rejected");
        assert!(stderr.contains("between 6 and 32"), "stderr: {stderr}");
    }
}

// ── Session commands ─────────────────────────────────────────────────

#[test]
fn test_session_set_show_clear() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    let (code, _, stderr) = run_in(
        dir.path(),
        &["session", "set", "--token", "tok-abc-123", "--user-id", "u42"],
        &[],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    let raw = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
    assert!(raw.contains("\"userId\""));

    let (code, stdout, _) = run_in(dir.path(), &["session", "show"], &[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("signed in"));
    assert!(stdout.contains("u42"));
    assert!(!stdout.contains("tok-abc-123"), "token must not be printed");

    let (code, _, _) = run_in(dir.path(), &["session", "clear"], &[]);
    assert_eq!(code, 0);
    assert!(!dir.path().join("session.json").exists());

    let (_, stdout, _) = run_in(dir.path(), &["session", "show"], &[]);
    assert!(stdout.contains("not signed in"));
}

#[test]
fn test_session_set_rejects_empty_token() {
    let (code, _, stderr) = run(&["session", "set", "--token", "  "]);
    assert_ne!(code, 0);
    assert!(stderr.contains("token must not be empty"), "stderr: {stderr}");
}

// ── Vault commands without a server ──────────────────────────────────

#[test]
fn test_list_requires_encryption_key() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let (code, _, stderr) = run_in(
        dir.path(),
        &["list"],
        &[("PASSVAULT_API_URL", "http://127.0.0.1:19999")],
    );
    assert_ne!(code, 0);
    assert!(
        stderr.contains("PASSVAULT_ENCRYPTION_KEY"),
        "should name the missing setting: {stderr}"
    );
}

#[test]
fn test_list_without_session_reports_not_signed_in() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let (code, _, stderr) = run_in(dir.path(), &["list"], &OFFLINE);
    assert_ne!(code, 0);
    assert!(stderr.contains("not signed in"), "stderr: {stderr}");
}

#[test]
fn test_add_without_session_reports_not_signed_in() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let (code, _, stderr) = run_in(
        dir.path(),
        &["add", "--title", "GitHub", "--username", "bob", "--password", "pw"],
        &OFFLINE,
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("not signed in"), "stderr: {stderr}");
}

#[test]
fn test_add_rejects_password_and_generate_together() {
    let (code, _, stderr) = run(&[
        "add",
        "--title",
        "t",
        "--username",
        "u",
        "--password",
        "p",
        "--generate",
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("cannot be used with"), "stderr: {stderr}");
}

#[test]
fn test_add_requires_a_password_source() {
    let (code, _, stderr) = run(&["add", "--title", "t", "--username", "u"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("--password"), "stderr: {stderr}");
}

#[test]
fn test_unreachable_server_is_reported() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let (code, _, stderr) = run_in(
        dir.path(),
        &["list"],
        &[
            OFFLINE[0],
            OFFLINE[1],
            ("PASSVAULT_TOKEN", "tok"),
            ("PASSVAULT_MAX_RETRIES", "0"),
            ("PASSVAULT_TIMEOUT_SECS", "2"),
        ],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("failed to load vault"), "stderr: {stderr}");
}
