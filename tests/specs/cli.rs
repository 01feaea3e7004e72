// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI surface specs: status, stop, tasks, and argument handling.

use super::helpers::*;
use assert_cmd::Command;
use serial_test::serial;
use std::time::Duration;

fn tigerflow() -> Command {
    Command::new(tigerflow_bin())
}

#[test]
fn help_lists_the_commands() {
    let assert = tigerflow().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    for command in ["run", "status", "stop", "tasks"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn status_on_missing_directory_fails() {
    let assert = tigerflow().args(["status", "/no/such/output"]).assert().code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("does not exist"));
}

#[test]
fn status_requires_a_pipeline_directory() {
    let dir = tempfile::tempdir().unwrap();
    let assert = tigerflow()
        .args(["status", &dir.path().display().to_string()])
        .assert()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(stderr.contains("missing .tigerflow"));
}

#[test]
fn status_reports_not_running_on_a_cold_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let internal = dir.path().join(".tigerflow");
    std::fs::create_dir_all(internal.join(".symlinks")).unwrap();
    std::fs::create_dir_all(internal.join(".finished")).unwrap();

    let assert = tigerflow()
        .args(["status", &dir.path().display().to_string()])
        .assert()
        .code(1);
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Pipeline not running"));
}

#[test]
fn status_json_shape() {
    let dir = tempfile::tempdir().unwrap();
    let internal = dir.path().join(".tigerflow");
    std::fs::create_dir_all(internal.join(".symlinks")).unwrap();
    std::fs::create_dir_all(internal.join(".finished")).unwrap();
    std::fs::create_dir_all(internal.join("echo")).unwrap();
    std::fs::write(internal.join(".finished/a.txt"), "").unwrap();
    std::fs::write(internal.join("echo/b.err"), "boom").unwrap();

    let assert = tigerflow()
        .args(["status", &dir.path().display().to_string(), "--json"])
        .assert()
        .code(1);
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(value["running"], serde_json::json!(false));
    assert_eq!(value["finished"], serde_json::json!(1));
    assert_eq!(value["failed"], serde_json::json!(1));
    assert_eq!(value["tasks"][0]["name"], serde_json::json!("echo"));
    assert_eq!(value["tasks"][0]["failed"], serde_json::json!(1));
}

#[test]
fn stop_without_pid_file_is_a_clean_noop() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".tigerflow")).unwrap();

    let assert = tigerflow()
        .args(["stop", &dir.path().display().to_string()])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("not running"));
}

#[test]
fn stop_cleans_a_stale_pid_file() {
    let dir = tempfile::tempdir().unwrap();
    let internal = dir.path().join(".tigerflow");
    std::fs::create_dir_all(&internal).unwrap();
    std::fs::write(internal.join("run.pid"), "4194000").unwrap();

    tigerflow()
        .args(["stop", &dir.path().display().to_string()])
        .assert()
        .success();
    assert!(!internal.join("run.pid").exists());
}

#[test]
#[serial]
fn stop_terminates_a_running_pipeline() {
    let fx = PipelineFixture::new(
        r#"
tasks:
  - name: echo
    kind: local
    library: echo
    input_ext: .txt
    output_ext: .txt
"#,
    );
    let supervisor = Supervisor::spawn(&fx);
    wait_until(Duration::from_secs(30), "the PID record", || {
        exists(&fx.internal().join("run.pid"))
    });

    let assert = tigerflow()
        .args(["stop", &fx.output_dir.display().to_string()])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Sent SIGTERM"));

    assert_eq!(supervisor.wait_code(), 128 + 15);
}

#[test]
fn tasks_list_shows_builtins() {
    let assert = tigerflow().args(["tasks", "list"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Built-in tasks:"));
    assert!(stdout.contains("echo"));
    assert!(stdout.contains("count"));
}

#[test]
fn tasks_info_reports_module_and_version() {
    let assert = tigerflow().args(["tasks", "info", "echo"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Source: built-in"));
    assert!(stdout.contains("task exec echo"));
    assert!(stdout.contains("Version:"));
}

#[test]
fn tasks_info_unknown_name_fails() {
    let assert = tigerflow().args(["tasks", "info", "ghost"]).assert().code(1);
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("not found"));
}

#[test]
fn task_exec_help_probe_exits_cleanly() {
    // The supervisor validates launch targets with a `--help` probe.
    tigerflow()
        .args(["task", "exec", "echo", "--help"])
        .assert()
        .success();
}

#[test]
fn run_with_missing_config_fails() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    tigerflow()
        .args([
            "run",
            "/no/such/config.yml",
            &input.path().display().to_string(),
            &output.path().display().to_string(),
        ])
        .assert()
        .code(1);
}
