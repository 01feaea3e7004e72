// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch-target validation.
//!
//! Before any task starts, its command is invoked with a `--help` probe
//! under a bounded timeout. A non-zero exit or a hang is a fatal
//! configuration error: better to refuse the pipeline than to launch a
//! runtime that immediately dies in the background.

use std::time::Duration;

use tokio::process::Command;

use crate::error::PipelineError;

/// Probe `<command> --help` and require a clean exit within `timeout`.
pub async fn validate_task_cli(
    task: &str,
    command: &str,
    timeout: Duration,
) -> Result<(), PipelineError> {
    let mut cmd = Command::new("bash");
    cmd.args(["-c", &format!("{command} --help")])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| PipelineError::Spawn {
        task: task.to_string(),
        source,
    })?;

    let status = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| PipelineError::ProbeTimeout { task: task.to_string(), timeout })?
        .map_err(|source| PipelineError::io("run task CLI probe", source))?
        .status;

    if !status.success() {
        return Err(PipelineError::InvalidTaskCli {
            task: task.to_string(),
            reason: format!("`{command} --help` exited with {status}"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
