// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end pipeline scenarios: stage → process → harvest → shutdown.

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;

const SIGTERM_EXIT: i32 = 128 + 15;

#[test]
#[serial]
fn single_stage_pipeline_finishes_files_and_exits_on_sigterm() {
    let fx = PipelineFixture::new(
        r#"
tasks:
  - name: echo
    kind: local
    library: echo
    input_ext: .txt
    output_ext: .txt
    keep_output: false
"#,
    );
    fx.write_input("a.txt", "hi");
    fx.write_input("b.txt", "yo");

    let supervisor = Supervisor::spawn(&fx);

    wait_until(Duration::from_secs(60), "both inputs to finish", || {
        exists(&fx.finished("a.txt")) && exists(&fx.finished("b.txt"))
    });

    // Finished markers are empty; staged symlinks are gone; the
    // intermediate output was dropped (keep_output = false).
    assert_eq!(std::fs::read(fx.finished("a.txt")).unwrap(), b"");
    wait_until(Duration::from_secs(10), "symlinks to clear", || {
        dir_is_empty(&fx.symlinks_dir())
    });
    assert!(!exists(&fx.internal().join("echo").join("a.txt")));

    supervisor.terminate();
    assert_eq!(supervisor.wait_code(), SIGTERM_EXIT);

    // PID record is removed on clean shutdown.
    assert!(!exists(&fx.internal().join("run.pid")));
}

#[test]
#[serial]
fn two_stage_chain_promotes_retained_outputs() {
    let fx = PipelineFixture::new(
        r#"
tasks:
  - name: upper
    kind: local
    library: echo
    input_ext: .txt
    output_ext: .txt
    keep_output: true
    params:
      uppercase: true
  - name: count
    kind: local
    library: count
    input_ext: .txt
    output_ext: .out
    keep_output: true
    depends_on: upper
"#,
    );
    fx.write_input("x.txt", "abc");

    let supervisor = Supervisor::spawn(&fx);

    wait_until(Duration::from_secs(60), "the chain to finish", || {
        exists(&fx.finished("x.txt"))
    });

    wait_until(Duration::from_secs(10), "outputs to be promoted", || {
        exists(&fx.output_dir.join("upper/x.txt")) && exists(&fx.output_dir.join("count/x.out"))
    });
    assert_eq!(
        std::fs::read_to_string(fx.output_dir.join("upper/x.txt")).unwrap(),
        "ABC"
    );
    assert_eq!(
        std::fs::read_to_string(fx.output_dir.join("count/x.out")).unwrap(),
        "3"
    );
    wait_until(Duration::from_secs(10), "symlinks to clear", || {
        dir_is_empty(&fx.symlinks_dir())
    });

    supervisor.terminate();
    assert_eq!(supervisor.wait_code(), SIGTERM_EXIT);
}

#[test]
#[serial]
fn failing_task_writes_error_report_and_keeps_the_stem_staged() {
    let fx = PipelineFixture::new("placeholder: rewritten below\n");
    // A module implementing the task contract that fails every file,
    // like a user task whose `run` raises.
    let module = fx.write_module(
        "failing.sh",
        r#"#!/bin/bash
# Always fails each input file.
while [ $# -gt 0 ]; do
  case "$1" in
    --input-dir) IN="$2"; shift 2;;
    --output-dir) OUT="$2"; shift 2;;
    --input-ext) IEXT="$2"; shift 2;;
    --output-ext) OEXT="$2"; shift 2;;
    --help) echo "usage: failing"; exit 0;;
    *) shift;;
  esac
done
while true; do
  for f in "$IN"/*"$IEXT"; do
    [ -e "$f" ] || continue
    stem=$(basename "$f" "$IEXT")
    [ -e "$OUT/$stem$OEXT" ] && continue
    [ -e "$OUT/$stem.err" ] && continue
    printf 'boom' > "$OUT/tmp$$"
    mv "$OUT/tmp$$" "$OUT/$stem.err"
  done
  sleep 1
done
"#,
    );
    std::fs::write(
        &fx.config_file,
        format!(
            r#"
tasks:
  - name: doomed
    kind: local
    module: {}
    input_ext: .txt
    output_ext: .out
"#,
            module.display()
        ),
    )
    .unwrap();
    fx.write_input("z.txt", "anything");

    let supervisor = Supervisor::spawn(&fx);

    let err_file = fx.internal().join("doomed").join("z.err");
    wait_until(Duration::from_secs(60), "the error report", || exists(&err_file));

    assert!(std::fs::read_to_string(&err_file).unwrap().contains("boom"));
    // Failed files are not auto-finished: still staged, never finished.
    assert!(exists(&fx.symlinks_dir().join("z.txt")));
    assert!(!exists(&fx.finished("z.txt")));

    supervisor.terminate();
    assert_eq!(supervisor.wait_code(), SIGTERM_EXIT);
}

#[test]
#[serial]
fn concurrent_run_is_refused_with_exit_1() {
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

    let output = std::process::Command::new(tigerflow_bin())
        .arg("run")
        .arg(&fx.config_file)
        .arg(&fx.input_dir)
        .arg(&fx.output_dir)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already running"));

    supervisor.terminate();
    assert_eq!(supervisor.wait_code(), SIGTERM_EXIT);
}

#[test]
#[serial]
fn repeated_sigterm_still_exits_once_with_the_signal_code() {
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

    supervisor.terminate();
    supervisor.terminate();
    supervisor.terminate();
    assert_eq!(supervisor.wait_code(), SIGTERM_EXIT);
}
