// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variant C: fan-out to scheduler-managed worker jobs.
//!
//! The runtime process never executes user code. It assigns each
//! unprocessed stem to exactly one worker by dropping a claim file into
//! that worker's spool directory (`<output>/.spool/<worker>/`), and
//! releases the handle when the stem's output or error report appears in
//! the shared output directory. Workers are scheduler jobs running the
//! same task binary in `--worker` mode; they are spawned on demand up to
//! `max_workers` and released after enough consecutive idle scale checks.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::{RunnerConfig, RunnerError};
use crate::scan;
use tf_core::ext::{strip_ext, ERR_EXT};
use tf_core::workspace::SPOOL_DIR;
use tf_slurm::{BatchScript, ClusterClient, JobId};

/// Per-worker resource descriptor (mirrors the config's
/// `worker_resources` block on the runtime side of the CLI boundary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResources {
    pub cpus: u32,
    pub gpus: Option<u32>,
    pub memory: String,
    pub time: String,
    pub sbatch_options: Vec<String>,
}

/// Everything the cluster runtime needs beyond the shared runner config.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub runner: RunnerConfig,
    pub account: String,
    pub max_workers: usize,
    pub resources: WorkerResources,
    /// Worker prologue commands, one per line.
    pub setup_commands: Vec<String>,
    /// Command line that starts this task binary; the runtime appends the
    /// worker-mode flags.
    pub worker_command: String,
    pub scale_interval: std::time::Duration,
    pub scale_wait_count: u32,
    pub worker_startup_timeout: std::time::Duration,
}

struct WorkerHandle {
    id: String,
    job: JobId,
    spool_dir: PathBuf,
    /// Stems currently assigned to this worker.
    assigned: HashSet<String>,
    /// Consecutive idle scale checks.
    idle_checks: u32,
    submitted_at: Instant,
    /// Whether the worker has produced at least one result.
    progressed: bool,
}

/// The cluster fan-out runtime (client side).
pub struct ClusterRunner<C> {
    client: Arc<C>,
    config: ClusterConfig,
    shutdown: CancellationToken,
}

impl<C: ClusterClient> ClusterRunner<C> {
    pub fn new(client: Arc<C>, config: ClusterConfig) -> Self {
        Self { client, config, shutdown: CancellationToken::new() }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> Result<(), RunnerError> {
        self.config.runner.validate()?;
        let spool_root = self.config.runner.output_dir.join(SPOOL_DIR);
        std::fs::create_dir_all(&spool_root)
            .map_err(|source| RunnerError::Io { what: "spool setup", source })?;
        scan::remove_temporary_files(&self.config.runner.output_dir)
            .map_err(|source| RunnerError::Io { what: "temporary cleanup", source })?;

        let mut workers: Vec<WorkerHandle> = Vec::new();
        let mut spawned_total = 0usize;
        let mut last_scale_check = Instant::now();

        while !self.shutdown.is_cancelled() {
            self.collect(&mut workers);
            self.reap_stalled(&mut workers).await;
            if let Err(e) = self.dispatch(&mut workers, &spool_root, &mut spawned_total).await {
                tracing::warn!(error = %e, "dispatch failed; will retry next poll");
            }
            if last_scale_check.elapsed() >= self.config.scale_interval {
                last_scale_check = Instant::now();
                self.scale_down(&mut workers).await;
            }

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.runner.poll_interval) => {}
            }
        }

        tracing::info!(task = %self.config.runner.task_name, "Shutting down cluster task");
        for worker in &workers {
            if let Err(e) = self.client.cancel(worker.job).await {
                tracing::warn!(worker = %worker.id, error = %e, "failed to cancel worker");
            }
        }
        tracing::info!(task = %self.config.runner.task_name, "Cluster task shutdown complete");
        Ok(())
    }

    /// Release handles whose stem reached a terminal state.
    fn collect(&self, workers: &mut [WorkerHandle]) {
        for worker in workers.iter_mut() {
            let done: Vec<String> = worker
                .assigned
                .iter()
                .filter(|stem| self.is_terminal(stem))
                .cloned()
                .collect();
            for stem in done {
                worker.assigned.remove(&stem);
                worker.progressed = true;
                // The worker normally removes its claim; sweep it here in
                // case it died between writing the output and the unlink.
                let claim = worker.spool_dir.join(self.claim_name(&stem));
                let _ = std::fs::remove_file(claim);
            }
        }
    }

    /// Recycle workers that never produced anything within the startup
    /// timeout; their claims return to the pool.
    async fn reap_stalled(&self, workers: &mut Vec<WorkerHandle>) {
        let timeout = self.config.worker_startup_timeout;
        let mut stalled = Vec::new();
        for (index, worker) in workers.iter().enumerate() {
            if !worker.progressed
                && !worker.assigned.is_empty()
                && worker.submitted_at.elapsed() >= timeout
            {
                stalled.push(index);
            }
        }
        for index in stalled.into_iter().rev() {
            let worker = workers.remove(index);
            tracing::error!(
                worker = %worker.id,
                job = %worker.job,
                "worker produced nothing within the startup timeout; recycling"
            );
            if let Err(e) = self.client.cancel(worker.job).await {
                tracing::warn!(worker = %worker.id, error = %e, "failed to cancel worker");
            }
            let _ = std::fs::remove_dir_all(&worker.spool_dir);
        }
    }

    /// Assign every unprocessed, unassigned stem to a worker, spawning
    /// workers up to `max_workers` as needed.
    async fn dispatch(
        &self,
        workers: &mut Vec<WorkerHandle>,
        spool_root: &std::path::Path,
        spawned_total: &mut usize,
    ) -> Result<(), RunnerError> {
        let files = self
            .config
            .runner
            .scan()
            .map_err(|source| RunnerError::Io { what: "input scan", source })?;

        let assigned: HashSet<String> =
            workers.iter().flat_map(|w| w.assigned.iter().cloned()).collect();
        let pending: Vec<PathBuf> = files
            .into_iter()
            .filter(|f| self.stem_of(f).is_some_and(|stem| !assigned.contains(&stem)))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let desired = (assigned.len() + pending.len()).min(self.config.max_workers).max(1);
        while workers.len() < desired {
            match self.spawn_worker(spool_root, *spawned_total).await {
                Ok(worker) => {
                    *spawned_total += 1;
                    workers.push(worker);
                }
                Err(e) => {
                    tracing::error!(error = %e, "worker submission failed");
                    break;
                }
            }
        }
        if workers.is_empty() {
            return Ok(());
        }

        for file in pending {
            let Some(stem) = self.stem_of(&file) else { continue };
            // Least-loaded worker takes the next stem.
            let Some(worker) =
                workers.iter_mut().min_by_key(|w| (w.assigned.len(), w.id.clone()))
            else {
                break;
            };
            let claim = worker.spool_dir.join(self.claim_name(&stem));
            let absolute = file.canonicalize().unwrap_or(file);
            std::fs::write(&claim, format!("{}\n", absolute.display()))
                .map_err(|source| RunnerError::Io { what: "claim write", source })?;
            worker.assigned.insert(stem);
            worker.idle_checks = 0;
        }
        Ok(())
    }

    async fn spawn_worker(
        &self,
        spool_root: &std::path::Path,
        index: usize,
    ) -> Result<WorkerHandle, RunnerError> {
        let id = format!("w{index}");
        let spool_dir = spool_root.join(&id);
        std::fs::create_dir_all(&spool_dir)
            .map_err(|source| RunnerError::Io { what: "spool setup", source })?;

        let command = format!(
            "{} --worker-id {id} --spool-dir {}",
            self.config.worker_command,
            spool_dir.display(),
        );
        let script = BatchScript {
            job_name: format!("{}-worker", self.config.runner.task_name),
            account: self.config.account.clone(),
            cpus: self.config.resources.cpus,
            gpus: self.config.resources.gpus,
            memory: self.config.resources.memory.clone(),
            time: self.config.resources.time.clone(),
            log_dir: self.config.runner.output_dir.join("logs"),
            extra_options: self.config.resources.sbatch_options.clone(),
            prologue: self.config.setup_commands.clone(),
            command,
        };
        let job = self.client.submit(&script.render()).await?;
        tracing::info!(worker = %id, job = %job, "Submitted worker");
        Ok(WorkerHandle {
            id,
            job,
            spool_dir,
            assigned: HashSet::new(),
            idle_checks: 0,
            submitted_at: Instant::now(),
            progressed: false,
        })
    }

    /// Release workers that stayed idle for enough consecutive checks.
    async fn scale_down(&self, workers: &mut Vec<WorkerHandle>) {
        for worker in workers.iter_mut() {
            if worker.assigned.is_empty() {
                worker.idle_checks += 1;
            } else {
                worker.idle_checks = 0;
            }
        }
        let threshold = self.config.scale_wait_count;
        let mut index = 0;
        while index < workers.len() {
            if workers[index].idle_checks >= threshold {
                let worker = workers.remove(index);
                tracing::info!(worker = %worker.id, job = %worker.job, "Releasing idle worker");
                if let Err(e) = self.client.cancel(worker.job).await {
                    tracing::warn!(worker = %worker.id, error = %e, "failed to cancel worker");
                }
                let _ = std::fs::remove_dir_all(&worker.spool_dir);
            } else {
                index += 1;
            }
        }
    }

    fn stem_of(&self, file: &std::path::Path) -> Option<String> {
        let name = file.file_name()?.to_string_lossy().into_owned();
        strip_ext(&name, &self.config.runner.input_ext).map(str::to_string)
    }

    /// Claim files carry the input file's full name so workers can map
    /// them back without knowing the extension arithmetic.
    fn claim_name(&self, stem: &str) -> String {
        format!("{stem}{}", self.config.runner.input_ext)
    }

    fn is_terminal(&self, stem: &str) -> bool {
        let out = self
            .config
            .runner
            .output_dir
            .join(format!("{stem}{}", self.config.runner.output_ext));
        let err = self.config.runner.output_dir.join(format!("{stem}{ERR_EXT}"));
        out.is_file() || err.is_file()
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
