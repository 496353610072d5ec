//! Integration tests for the `dms` CLI.
//!
//! Each test creates a temp directory holding a `dms.toml` and a database,
//! runs `dms` as a subprocess there, and checks its output.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// A working directory whose `dms.toml` points at `test.db`
fn setup() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("dms.toml"),
        r#"[database]
path = "test.db"

[auth]
pbkdf2_iterations = 1000

[log]
file = "logs/dms.log"
"#,
    )
    .unwrap();
    tmp
}

/// Run `dms` with the given args in the given directory, returning (stdout, stderr, success).
fn run_dms(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_dms"))
        .args(args)
        .current_dir(dir)
        .env_remove("DMS_DATABASE")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run dms");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `dms` expecting success, return stdout.
fn run_dms_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_dms(dir, args);
    if !success {
        panic!(
            "dms {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Run `dms` expecting failure, return stderr.
fn run_dms_err(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_dms(dir, args);
    if success {
        panic!("dms {:?} unexpectedly succeeded:\nstdout: {}", args, stdout);
    }
    stderr
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_database_and_admin() {
    let tmp = setup();
    let out = run_dms_ok(
        tmp.path(),
        &["init", "--admin", "root", "--password", "secret"],
    );
    assert!(out.contains("Database ready at test.db"));
    assert!(out.contains("Created administrator 'root'"));
    assert!(tmp.path().join("test.db").exists());
    assert!(tmp.path().join("logs/dms.log").exists());

    let list = run_dms_ok(tmp.path(), &["user", "list"]);
    assert!(list.contains("root"));
    assert!(list.contains("Req, Issue, Ret, Rpt, Users"));
}

#[test]
fn test_init_twice_with_same_admin_fails() {
    let tmp = setup();
    run_dms_ok(tmp.path(), &["init", "--admin", "root", "--password", "pw"]);
    let err = run_dms_err(tmp.path(), &["init", "--admin", "root", "--password", "pw"]);
    assert!(err.starts_with("error: "));
    assert!(err.contains("already exists"));
}

#[test]
fn test_database_flag_overrides_config() {
    let tmp = setup();
    run_dms_ok(tmp.path(), &["init", "--database", "other.db"]);
    assert!(tmp.path().join("other.db").exists());
    assert!(!tmp.path().join("test.db").exists());
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("dms.toml"), "[ui]\npage_size = \"ten\"\n").unwrap();
    let err = run_dms_err(tmp.path(), &["user", "list"]);
    assert!(err.contains("invalid config"));
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[test]
fn test_user_add_and_list_json() {
    let tmp = setup();
    let out = run_dms_ok(
        tmp.path(),
        &[
            "user", "add", "jdoe", "--password", "pw", "--department", "Drafting", "--perm", "1",
            "--perm", "4",
        ],
    );
    assert!(out.contains("Added user 'jdoe'"));

    let out = run_dms_ok(tmp.path(), &["user", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let users = parsed.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "jdoe");
    assert_eq!(users[0]["department"], "Drafting");
    assert_eq!(users[0]["permissions"], serde_json::json!([1, 4]));
}

#[test]
fn test_duplicate_user_is_rejected() {
    let tmp = setup();
    run_dms_ok(tmp.path(), &["user", "add", "jdoe", "--password", "pw"]);
    let err = run_dms_err(tmp.path(), &["user", "add", "jdoe", "--password", "pw2"]);
    assert!(err.contains("Username 'jdoe' already exists"));
}

#[test]
fn test_user_passwd_and_delete() {
    let tmp = setup();
    run_dms_ok(tmp.path(), &["user", "add", "jdoe", "--password", "pw"]);
    let out = run_dms_ok(tmp.path(), &["user", "passwd", "jdoe", "--password", "new"]);
    assert!(out.contains("Password updated for 'jdoe'"));

    let out = run_dms_ok(tmp.path(), &["user", "delete", "jdoe"]);
    assert!(out.contains("Deleted user 'jdoe'"));
    let list = run_dms_ok(tmp.path(), &["user", "list", "--json"]);
    assert_eq!(list.trim(), "[]");
}

#[test]
fn test_unknown_user_fails() {
    let tmp = setup();
    let err = run_dms_err(tmp.path(), &["user", "delete", "ghost"]);
    assert!(err.contains("no user named 'ghost'"));
}

// ---------------------------------------------------------------------------
// Drawings
// ---------------------------------------------------------------------------

#[test]
fn test_drawing_add_and_list() {
    let tmp = setup();
    run_dms_ok(
        tmp.path(),
        &[
            "drawing",
            "add",
            "MDI-DRW-101",
            "--title",
            "Pump housing",
            "--revision",
            "A.0",
            "--approved-on",
            "2026-01-12",
        ],
    );
    run_dms_ok(tmp.path(), &["drawing", "add", "EL-0417", "--title", "Panel wiring"]);

    let out = run_dms_ok(tmp.path(), &["drawing", "list"]);
    assert!(out.contains("DRAWING NO"));
    assert!(out.contains("MDI-DRW-101"));
    assert!(out.contains("APPROVED"));
    assert!(out.contains("EL-0417"));

    let out = run_dms_ok(tmp.path(), &["drawing", "list", "--search", "mdi"]);
    assert!(out.contains("MDI-DRW-101"));
    assert!(!out.contains("EL-0417"));

    // Titles are shown but not searched
    let out = run_dms_ok(tmp.path(), &["drawing", "list", "--search", "pump"]);
    assert_eq!(out.trim(), "No drawings");

    let out = run_dms_ok(tmp.path(), &["drawing", "list", "--status", "requested"]);
    assert_eq!(out.trim(), "No drawings");

    let out = run_dms_ok(tmp.path(), &["drawing", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[0]["number"], "MDI-DRW-101");
    assert_eq!(parsed[0]["approved_on"], "2026-01-12");
    assert_eq!(parsed[1]["revision"], "0");
}

#[test]
fn test_duplicate_drawing_number_fails() {
    let tmp = setup();
    run_dms_ok(tmp.path(), &["drawing", "add", "EL-0417"]);
    let err = run_dms_err(tmp.path(), &["drawing", "add", "EL-0417"]);
    assert!(err.contains("already exists"));
}

#[test]
fn test_bad_inputs_fail() {
    let tmp = setup();
    let err = run_dms_err(
        tmp.path(),
        &["drawing", "add", "X-1", "--approved-on", "12/01/2026"],
    );
    assert!(err.contains("invalid --approved-on"));
    let err = run_dms_err(tmp.path(), &["drawing", "list", "--status", "lost"]);
    assert!(err.contains("unknown drawing status: lost"));
}
