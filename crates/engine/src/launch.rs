// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task launching and per-task liveness handles.

use tf_config::{LaunchTarget, Task, TaskDirs, TaskKind};
use tf_slurm::{ClusterClient, JobId, StatusKind, TaskStatus};
use tokio::process::{Child, Command};

use crate::error::PipelineError;

/// A started task: a local subprocess or a cluster client job.
#[derive(Debug)]
pub enum TaskHandle {
    Local { child: Child },
    Cluster { job: JobId },
}

impl TaskHandle {
    /// Start a task, returning the handle the supervisor retains.
    pub(crate) async fn start<C: ClusterClient>(
        task: &Task,
        dirs: &TaskDirs,
        runner: &str,
        client: &C,
        client_hours: u64,
    ) -> Result<Self, PipelineError> {
        match &task.kind {
            TaskKind::Local | TaskKind::LocalAsync { .. } => {
                let script = tf_config::local_script(task, dirs, runner);
                let child = Command::new("bash")
                    .args(["-c", &script])
                    .spawn()
                    .map_err(|source| PipelineError::Spawn {
                        task: task.name.clone(),
                        source,
                    })?;
                tracing::info!(
                    task = %task.name,
                    pid = child.id().unwrap_or_default(),
                    "Started with PID"
                );
                Ok(TaskHandle::Local { child })
            }
            TaskKind::Slurm { .. } => {
                let script = tf_config::slurm_client_script(task, dirs, runner, client_hours);
                let job = client.submit(&script).await.map_err(|source| {
                    PipelineError::Submit { task: task.name.clone(), source }
                })?;
                tracing::info!(task = %task.name, job = %job, "Submitted with cluster job ID");
                Ok(TaskHandle::Cluster { job })
            }
        }
    }

    /// Current liveness.
    pub(crate) async fn status<C: ClusterClient>(
        &mut self,
        task: &Task,
        client: &C,
    ) -> TaskStatus {
        match self {
            TaskHandle::Local { child } => match child.try_wait() {
                Ok(None) => TaskStatus::active(None),
                Ok(Some(status)) => TaskStatus::inactive(Some(format!("Exit code: {status}"))),
                Err(e) => TaskStatus::inactive(Some(format!("Wait failed: {e}"))),
            },
            TaskHandle::Cluster { job } => {
                match client.status(&task.client_job_name(), &task.worker_job_name()).await {
                    Ok(status) => status,
                    Err(e) => {
                        // A flaky queue query is not evidence of death.
                        tracing::warn!(task = %task.name, job = %job, error = %e,
                            "cluster status query failed");
                        TaskStatus {
                            kind: StatusKind::Pending,
                            detail: Some("status query failed".to_string()),
                        }
                    }
                }
            }
        }
    }

    /// Send the stage-appropriate cancel: SIGTERM for local subprocesses,
    /// a scheduler cancel for cluster jobs.
    pub(crate) async fn cancel<C: ClusterClient>(&mut self, task: &Task, client: &C) {
        match self {
            TaskHandle::Local { child } => {
                if let Some(pid) = child.id() {
                    terminate(pid as i32);
                }
            }
            TaskHandle::Cluster { job } => {
                if let Err(e) = client.cancel(*job).await {
                    tracing::warn!(task = %task.name, job = %job, error = %e,
                        "failed to cancel cluster job");
                }
            }
        }
    }
}

fn terminate(pid: i32) {
    // SIGTERM, not SIGKILL: the runtimes run their teardown path.
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
        tracing::warn!(pid, error = %e, "failed to send SIGTERM");
    }
}

/// Command that starts a task's runtime: the module path, or this binary
/// re-invoked for a library task.
pub(crate) fn runner_command(task: &Task) -> Result<String, PipelineError> {
    match &task.target {
        LaunchTarget::Module(path) => Ok(path.display().to_string()),
        LaunchTarget::Library(name) => {
            let exe = std::env::current_exe()
                .map_err(|source| PipelineError::io("resolve current executable", source))?;
            Ok(format!("{} task exec {name}", exe.display()))
        }
    }
}
