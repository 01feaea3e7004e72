// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cluster client trait and its Slurm implementation.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::SlurmError;
use crate::status::{StatusKind, TaskStatus};

/// Scheduler job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Submit/query/cancel interface to the cluster scheduler.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Submit a job whose standard input is the script; returns the job ID
    /// parsed from the submission tool's output.
    async fn submit(&self, script: &str) -> Result<JobId, SlurmError>;

    /// Queue status by job name. `ACTIVE` when any client record is
    /// running (detail counts running workers), `PENDING` with the queue
    /// reason, `INACTIVE` otherwise.
    async fn status(
        &self,
        client_job_name: &str,
        worker_job_name: &str,
    ) -> Result<TaskStatus, SlurmError>;

    /// Best-effort cancel.
    async fn cancel(&self, job_id: JobId) -> Result<(), SlurmError>;
}

/// Real scheduler client shelling out to `sbatch`/`squeue`/`scancel`.
#[derive(Debug, Clone)]
pub struct SlurmClient {
    /// Bound on each scheduler command.
    pub command_timeout: Duration,
}

impl Default for SlurmClient {
    fn default() -> Self {
        Self { command_timeout: Duration::from_secs(60) }
    }
}

impl SlurmClient {
    async fn squeue(&self, job_name: &str, format: &str) -> Result<String, SlurmError> {
        let mut cmd = Command::new("squeue");
        cmd.args(["--me", "-n", job_name, "-h", "-o", format]);
        let output =
            crate::subprocess::run_with_timeout(cmd, self.command_timeout, "squeue").await?;
        if !output.status.success() {
            return Err(SlurmError::CommandFailed {
                command: "squeue".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ClusterClient for SlurmClient {
    async fn submit(&self, script: &str) -> Result<JobId, SlurmError> {
        let mut child = Command::new("sbatch")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SlurmError::Spawn { command: "sbatch".to_string(), source })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|source| SlurmError::Io { command: "sbatch".to_string(), source })?;
        }

        let waited = tokio::time::timeout(self.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| SlurmError::Timeout {
                command: "sbatch".to_string(),
                timeout: self.command_timeout,
            })?;
        let output =
            waited.map_err(|source| SlurmError::Io { command: "sbatch".to_string(), source })?;

        if !output.status.success() {
            return Err(SlurmError::CommandFailed {
                command: "sbatch".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        parse_submit_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn status(
        &self,
        client_job_name: &str,
        worker_job_name: &str,
    ) -> Result<TaskStatus, SlurmError> {
        let client_states = self.squeue(client_job_name, "%.10T").await?;

        if client_states.contains("RUNNING") {
            let worker_states = self.squeue(worker_job_name, "%.10T").await?;
            return Ok(TaskStatus {
                kind: StatusKind::Active,
                detail: Some(active_detail(&worker_states)),
            });
        }
        if client_states.contains("PENDING") {
            let reason = self.squeue(client_job_name, "%.30R").await?;
            return Ok(TaskStatus {
                kind: StatusKind::Pending,
                detail: pending_detail(&reason),
            });
        }
        Ok(TaskStatus::inactive(None))
    }

    async fn cancel(&self, job_id: JobId) -> Result<(), SlurmError> {
        let mut cmd = Command::new("scancel");
        cmd.arg(job_id.to_string());
        let output =
            crate::subprocess::run_with_timeout(cmd, self.command_timeout, "scancel").await?;
        if !output.status.success() {
            // Best-effort: the job may already be gone.
            tracing::warn!(
                job_id = %job_id,
                status = %output.status,
                "scancel exited non-zero"
            );
        }
        Ok(())
    }
}

/// Parse `Submitted batch job NNNN` from sbatch output.
pub(crate) fn parse_submit_output(output: &str) -> Result<JobId, SlurmError> {
    for line in output.lines() {
        if let Some(rest) = line.trim().strip_prefix("Submitted batch job ") {
            if let Ok(id) = rest.trim().parse::<u64>() {
                return Ok(JobId(id));
            }
        }
    }
    Err(SlurmError::NoJobId { output: output.to_string() })
}

/// Count running worker records: `"N workers"`.
pub(crate) fn active_detail(worker_states: &str) -> String {
    let running = worker_states.matches("RUNNING").count();
    format!("{running} workers")
}

/// Extract the queue reason from the last squeue line: `"Reason: X"`.
pub(crate) fn pending_detail(reason_output: &str) -> Option<String> {
    reason_output
        .lines()
        .last()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| format!("Reason: {r}"))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
