// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use crate::error::SlurmError;

/// Run a command to completion with a timeout, capturing output.
///
/// On timeout the child is killed before the error is returned.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &str,
) -> Result<Output, SlurmError> {
    cmd.kill_on_drop(true);
    let child = cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(|source| SlurmError::Spawn { command: label.to_string(), source })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SlurmError::Io { command: label.to_string(), source }),
        Err(_) => Err(SlurmError::Timeout { command: label.to_string(), timeout }),
    }
}
