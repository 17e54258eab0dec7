//! CLI integration tests
//!
//! Run the built binary against scratch stores and check stdout, exit
//! codes and what lands on disk.

use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn artipub(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_artipub-cli"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn revision_count(store: &Path) -> i64 {
    let conn = Connection::open(store.join("ledger.db")).unwrap();
    conn.query_row("SELECT COUNT(*) FROM revisions", [], |row| row.get(0))
        .unwrap()
}

fn write_source(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

#[test]
fn test_publish_from_dir_then_no_change() {
    let temp_dir = TempDir::new().unwrap();
    write_source(&temp_dir.path().join("out"), &[("a.json", "1")]);

    let output = artipub(temp_dir.path(), &["publish", "--store", "store", "--from-dir", "out"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Published revision 1"));
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("store/current/a.json")).unwrap(),
        "1"
    );

    let output = artipub(temp_dir.path(), &["publish", "--store", "store", "--from-dir", "out"]);
    assert_success(&output);
    assert!(stdout(&output).contains("No changes (revision 1)"));
    assert_eq!(revision_count(&temp_dir.path().join("store")), 1);
}

#[test]
fn test_publish_dry_run_commits_nothing() {
    let temp_dir = TempDir::new().unwrap();
    write_source(&temp_dir.path().join("out"), &[("a.json", "1")]);

    let output = artipub(
        temp_dir.path(),
        &["publish", "--store", "store", "--from-dir", "out", "--dry-run"],
    );
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("Dry run"));
    assert!(out.contains("added a.json"));
    assert_eq!(revision_count(&temp_dir.path().join("store")), 0);
}

#[test]
fn test_publish_json_output() {
    let temp_dir = TempDir::new().unwrap();
    write_source(&temp_dir.path().join("out"), &[("a.json", "1"), ("b.json", "2")]);

    let output = artipub(
        temp_dir.path(),
        &["publish", "--store", "store", "--from-dir", "out", "--json"],
    );
    assert_success(&output);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["outcome"], "published");
    assert_eq!(value["revision"], 1);
    assert_eq!(value["changes"]["records"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_publish_summary_renders_markdown() {
    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("out");
    write_source(&out_dir, &[("a.json", "{\"v\": 1}\n")]);
    assert_success(&artipub(
        temp_dir.path(),
        &["publish", "--store", "store", "--from-dir", "out"],
    ));

    write_source(&out_dir, &[("a.json", "{\"v\": 2}\n")]);
    let output = artipub(
        temp_dir.path(),
        &["publish", "--store", "store", "--from-dir", "out", "--summary"],
    );
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("Published revision 2"));
    assert!(out.contains("## Artifact Changes"));
    assert!(out.contains("+{\"v\": 2}"));
}

#[cfg(unix)]
#[test]
fn test_publish_runs_command_generator() {
    let temp_dir = TempDir::new().unwrap();

    let output = artipub(
        temp_dir.path(),
        &[
            "publish",
            "--store",
            "store",
            "--",
            "sh",
            "-c",
            "printf hello > greeting.txt",
        ],
    );
    assert_success(&output);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("store/current/greeting.txt")).unwrap(),
        "hello"
    );
}

#[cfg(unix)]
#[test]
fn test_generator_failure_exit_code() {
    let temp_dir = TempDir::new().unwrap();

    let output = artipub(
        temp_dir.path(),
        &["publish", "--store", "store", "--", "sh", "-c", "echo broken >&2; exit 1"],
    );
    assert_eq!(output.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_GENERATOR"));
}

#[cfg(unix)]
#[test]
fn test_generator_timeout_exit_code() {
    let temp_dir = TempDir::new().unwrap();

    let output = artipub(
        temp_dir.path(),
        &[
            "publish",
            "--store",
            "store",
            "--generator-timeout-secs",
            "1",
            "--",
            "sh",
            "-c",
            "sleep 10",
        ],
    );
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(revision_count(&temp_dir.path().join("store")), 0);
}

#[test]
fn test_missing_generator_is_config_error() {
    let temp_dir = TempDir::new().unwrap();

    let output = artipub(temp_dir.path(), &["publish", "--store", "store"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_INVALID_CONFIG"));
}

#[test]
fn test_invalid_config_file_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("artipub.yaml"), "schema_version: 9\n").unwrap();

    let output = artipub(temp_dir.path(), &["publish", "--config", "artipub.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_publish_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    write_source(&temp_dir.path().join("out"), &[("settings.json", "{}")]);
    fs::write(
        temp_dir.path().join("artipub.yaml"),
        "schema_version: 0\nstore:\n  root: store\ngenerator:\n  kind: directory\n  dir: out\n",
    )
    .unwrap();

    let output = artipub(temp_dir.path(), &["publish", "--config", "artipub.yaml"]);
    assert_success(&output);
    assert!(temp_dir.path().join("store/current/settings.json").exists());
}

#[test]
fn test_store_root_that_is_a_file_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("store"), "not a directory").unwrap();
    write_source(&temp_dir.path().join("out"), &[("a.json", "1")]);

    let output = artipub(temp_dir.path(), &["publish", "--store", "store", "--from-dir", "out"]);
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn test_json_log_format_goes_to_stderr() {
    let temp_dir = TempDir::new().unwrap();
    write_source(&temp_dir.path().join("out"), &[("a.json", "1")]);

    let output = artipub(
        temp_dir.path(),
        &[
            "--log-format",
            "json",
            "--log-level",
            "info",
            "publish",
            "--store",
            "store",
            "--from-dir",
            "out",
        ],
    );
    assert_success(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"op\":\"publish_run\""), "stderr: {}", stderr);
    assert!(!stdout(&output).contains("publish_run"));
}

#[test]
fn test_invalid_log_level_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let output = artipub(
        temp_dir.path(),
        &["--log-level", "artipub_core=loud", "snapshot", "list", "--store", "store"],
    );
    assert_eq!(output.status.code(), Some(2));
}
