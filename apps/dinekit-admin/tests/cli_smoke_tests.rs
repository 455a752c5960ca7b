#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the dinekit-admin binary.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_admin(args: &[&str], dsn: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dinekit-admin"));
    cmd.args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dsn) = dsn {
        cmd.env("DINEKIT__DATABASE__DSN", dsn);
    }
    cmd.output().expect("Failed to execute dinekit-admin")
}

fn file_dsn(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("dinekit.db").display())
}

fn migrated(dir: &TempDir) -> String {
    let dsn = file_dsn(dir.path());
    let out = run_admin(&["migrate"], Some(&dsn));
    assert!(
        out.status.success(),
        "migrate failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    dsn
}

#[test]
fn test_cli_help_command() {
    let output = run_admin(&["--help"], None);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    for sub in ["migrate", "menu", "duplicate-menu", "report"] {
        assert!(stdout.contains(sub), "Should list '{sub}' subcommand");
    }
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_admin(&["--version"], None);
    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dinekit-admin"), "Should contain binary name");
}

#[test]
fn test_cli_invalid_command() {
    let output = run_admin(&["frobnicate"], None);
    assert!(!output.status.success(), "Unknown subcommand should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("frobnicate"), "Should name the bad subcommand");
}

#[test]
fn test_cli_missing_config_file() {
    let output = run_admin(&["--config", "/definitely/not/here.yaml", "migrate"], None);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
}

#[test]
fn test_cli_print_config_reflects_env() {
    let output = run_admin(&["--print-config"], Some("sqlite://from-env.db"));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sqlite://from-env.db"), "stdout: {stdout}");
    assert!(stdout.contains("tenancy"), "stdout: {stdout}");
}

#[test]
fn test_cli_migrate_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let dsn = migrated(&dir);
    let again = run_admin(&["migrate"], Some(&dsn));
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("migrations applied"));
}

#[test]
fn test_cli_report_after_migrate() {
    let dir = TempDir::new().unwrap();
    let dsn = migrated(&dir);

    let output = run_admin(
        &["report", "--admin-role", "platform_admin", "--table", "dishes"],
        Some(&dsn),
    );
    assert!(
        output.status.success(),
        "report failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report[0]["table"], "dishes");
    assert_eq!(report[0]["tenants"], serde_json::json!([]));
}

#[test]
fn test_cli_report_rejects_unknown_table_and_empty_role() {
    let dir = TempDir::new().unwrap();
    let dsn = migrated(&dir);

    let unknown = run_admin(
        &["report", "--admin-role", "platform_admin", "--table", "nope"],
        Some(&dsn),
    );
    assert!(!unknown.status.success());
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("nope"));

    let no_role = run_admin(&["report", "--admin-role", ""], Some(&dsn));
    assert!(!no_role.status.success());

    let missing_flag = run_admin(&["report"], Some(&dsn));
    assert!(!missing_flag.status.success(), "--admin-role is required");
}

#[test]
fn test_cli_scoped_commands_need_a_restaurant() {
    let dir = TempDir::new().unwrap();
    let dsn = migrated(&dir);

    let output = run_admin(&["menu"], Some(&dsn));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--tenant"));

    let empty = run_admin(&["menu", "--tenant", "1"], Some(&dsn));
    assert!(empty.status.success());
    let menu: serde_json::Value = serde_json::from_slice(&empty.stdout).unwrap();
    assert_eq!(menu, serde_json::json!([]));
}

#[test]
fn test_cli_duplicate_menu_failures() {
    let dir = TempDir::new().unwrap();
    let dsn = migrated(&dir);

    let missing = run_admin(
        &["duplicate-menu", "--from", "1", "--tenant", "2", "--admin-role", "platform_admin"],
        Some(&dsn),
    );
    assert!(!missing.status.success(), "restaurants do not exist");
    assert!(String::from_utf8_lossy(&missing.stderr).contains("menu duplication failed"));

    let same = run_admin(
        &["duplicate-menu", "--from", "1", "--tenant", "1", "--admin-role", "platform_admin"],
        Some(&dsn),
    );
    assert!(!same.status.success());

    let invalid = run_admin(
        &["duplicate-menu", "--from", "0", "--tenant", "2", "--admin-role", "platform_admin"],
        Some(&dsn),
    );
    assert!(!invalid.status.success());
    assert!(String::from_utf8_lossy(&invalid.stderr).contains("invalid source restaurant"));
}
