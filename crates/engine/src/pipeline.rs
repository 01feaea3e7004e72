// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor: startup, tracking loop, and graceful shutdown.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use tf_config::{PipelineConfig, Task, TaskDirs};
use tf_core::ext::ERR_EXT;
use tf_core::{PidFile, Settings, Workspace};
use tf_slurm::{ClusterClient, SlurmClient, TaskStatus};
use tf_staging::PipelineState;

use crate::error::PipelineError;
use crate::launch::{runner_command, TaskHandle};
use crate::probe::validate_task_cli;
use crate::sweep;

/// What the operator asked `run` to do.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub config_file: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub delete_input: bool,
    pub idle_timeout: Option<Duration>,
}

/// How a supervisor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Signal that initiated shutdown, if any.
    pub signal: Option<i32>,
    /// Whether the idle timeout fired.
    pub idle_timed_out: bool,
}

impl RunOutcome {
    /// `128 + signum` for signal-initiated termination, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.signal {
            Some(signum) => 128 + signum,
            None => 0,
        }
    }
}

/// A prepared pipeline supervisor.
///
/// `prepare` runs the idempotent startup sequence against existing state;
/// `run` starts the task fleet and enters the tracking loop.
pub struct Pipeline<C: ClusterClient = SlurmClient> {
    settings: Settings,
    options: PipelineOptions,
    ws: Workspace,
    config: PipelineConfig,
    client: Arc<C>,
    pid_file: Option<PidFile>,
    known_stems: HashSet<String>,
    task_error_files: HashMap<String, HashSet<String>>,
    task_status: HashMap<String, TaskStatus>,
    handles: HashMap<String, TaskHandle>,
    shutdown: CancellationToken,
    received_signal: Arc<AtomicI32>,
    last_activity: Instant,
}

impl Pipeline<SlurmClient> {
    pub async fn prepare(
        options: PipelineOptions,
        settings: Settings,
    ) -> Result<Self, PipelineError> {
        Self::prepare_with(options, settings, Arc::new(SlurmClient::default())).await
    }
}

impl<C: ClusterClient> Pipeline<C> {
    /// Run the startup sequence: resolve paths, take the instance lock,
    /// load and validate the configuration, probe every launch target,
    /// and sweep the workspace back to a trustworthy state.
    pub async fn prepare_with(
        options: PipelineOptions,
        settings: Settings,
        client: Arc<C>,
    ) -> Result<Self, PipelineError> {
        for path in [&options.config_file, &options.input_dir, &options.output_dir] {
            if !path.exists() {
                return Err(PipelineError::MissingPath(path.clone()));
            }
        }
        let mut options = options;
        options.input_dir = options
            .input_dir
            .canonicalize()
            .map_err(|source| PipelineError::io("resolve input directory", source))?;
        options.output_dir = options
            .output_dir
            .canonicalize()
            .map_err(|source| PipelineError::io("resolve output directory", source))?;

        let ws = Workspace::new(&options.output_dir);
        for dir in [ws.symlinks_dir(), ws.finished_dir()] {
            std::fs::create_dir_all(&dir)
                .map_err(|source| PipelineError::io("create workspace directories", source))?;
        }

        if let Some(pid) = tf_core::live_holder(&ws.pid_file()) {
            return Err(PipelineError::AlreadyRunning(pid));
        }
        let pid_file = PidFile::create(ws.pid_file())?;

        let config = PipelineConfig::load(&options.config_file)?;

        for task in config.tasks() {
            let command = runner_command(task)?;
            validate_task_cli(&task.name, &command, settings.task_validation_timeout).await?;
        }

        for task in config.tasks() {
            let dirs = [ws.task_dir(&task.name), ws.task_log_dir(&task.name)];
            for dir in dirs {
                std::fs::create_dir_all(&dir)
                    .map_err(|source| PipelineError::io("create task directories", source))?;
            }
            if task.keep_output {
                std::fs::create_dir_all(ws.public_task_dir(&task.name))
                    .map_err(|source| PipelineError::io("create task directories", source))?;
            }
        }

        if options.delete_input {
            sweep::delete_finished_inputs(&ws, &options.input_dir)?;
        }
        sweep::sweep_symlinks(&ws, &config)?;
        sweep::sweep_task_outputs(&ws, &config)?;
        let known_stems = sweep::known_stems(&ws)?;

        let task_error_files =
            config.tasks().iter().map(|t| (t.name.clone(), HashSet::new())).collect();
        let task_status = config
            .tasks()
            .iter()
            .map(|t| (t.name.clone(), TaskStatus::inactive(None)))
            .collect();

        Ok(Self {
            settings,
            options,
            ws,
            config,
            client,
            pid_file: Some(pid_file),
            known_stems,
            task_error_files,
            task_status,
            handles: HashMap::new(),
            shutdown: CancellationToken::new(),
            received_signal: Arc::new(AtomicI32::new(0)),
            last_activity: Instant::now(),
        })
    }

    /// Token external callers may cancel to stop the supervisor.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start the fleet and track it until shutdown; always runs the
    /// teardown path.
    pub async fn run(mut self) -> Result<RunOutcome, PipelineError> {
        spawn_signal_watcher(self.shutdown.clone(), Arc::clone(&self.received_signal));

        let result = self.run_inner().await;

        tracing::info!("Shutting down pipeline");
        self.shutdown_tasks().await;
        if let Some(pid_file) = self.pid_file.take() {
            if let Err(e) = pid_file.release() {
                tracing::warn!(error = %e, "failed to remove PID file");
            }
        }
        tracing::info!("Pipeline shutdown complete");

        let idle_timed_out = result?;
        let signum = self.received_signal.load(Ordering::SeqCst);
        let outcome = RunOutcome {
            signal: (signum != 0).then_some(signum),
            idle_timed_out,
        };
        match (outcome.signal, idle_timed_out) {
            (Some(signum), _) => {
                tracing::info!(signum, "Exiting on signal");
            }
            (None, true) => {
                tracing::info!("Exiting: idle timeout reached");
            }
            (None, false) => {}
        }
        Ok(outcome)
    }

    /// The tracking loop; returns whether the idle timeout fired.
    async fn run_inner(&mut self) -> Result<bool, PipelineError> {
        tracing::info!("Starting pipeline execution");
        self.start_tasks().await?;
        tracing::info!("All tasks started, beginning pipeline tracking loop");

        while !self.shutdown.is_cancelled() {
            self.check_task_status().await;
            self.stage_new_files();
            self.report_failed_files();
            self.process_completed_files();

            if let Some(timeout) = self.options.idle_timeout {
                if self.last_activity.elapsed() >= timeout {
                    return Ok(true);
                }
            }

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.settings.pipeline_poll_interval) => {}
            }
        }
        Ok(false)
    }

    fn task_dirs(&self, task: &Task) -> TaskDirs {
        let input_dir = match task.depends_on.as_deref() {
            Some(parent) => self.ws.task_dir(parent),
            None => self.ws.symlinks_dir(),
        };
        TaskDirs {
            input_dir,
            output_dir: self.ws.task_dir(&task.name),
            log_dir: self.ws.task_log_dir(&task.name),
        }
    }

    async fn start_tasks(&mut self) -> Result<(), PipelineError> {
        for task in self.config.tasks() {
            tracing::info!(task = %task.name, kind = task.kind.name(), "Starting task");
            let dirs = self.task_dirs(task);
            let runner = runner_command(task)?;
            let handle = TaskHandle::start(
                task,
                &dirs,
                &runner,
                self.client.as_ref(),
                self.settings.slurm_client_hours,
            )
            .await?;
            self.handles.insert(task.name.clone(), handle);
        }
        Ok(())
    }

    /// Refresh per-task liveness and log transitions; alive → dead is
    /// escalated to error severity.
    async fn check_task_status(&mut self) {
        for task in self.config.tasks() {
            let Some(handle) = self.handles.get_mut(&task.name) else {
                continue;
            };
            let status = handle.status(task, self.client.as_ref()).await;
            let previous = self.task_status.get(&task.name);
            if previous == Some(&status) {
                continue;
            }
            let from = previous.map(|s| s.to_string()).unwrap_or_default();
            if status.is_alive() {
                tracing::info!(task = %task.name, from = %from, to = %status, "Status changed");
            } else {
                tracing::error!(task = %task.name, from = %from, to = %status, "Status changed");
            }
            self.task_status.insert(task.name.clone(), status);
        }
    }

    /// Admit new inputs through the staging chain and symlink them.
    fn stage_new_files(&mut self) {
        let root_ext = self.config.root_input_ext().to_string();
        let entries = match std::fs::read_dir(&self.options.input_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to scan input directory");
                return;
            }
        };

        let mut candidates = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_file()
                && name.ends_with(&root_ext)
                && !self.known_stems.contains(&name)
            {
                candidates.push(entry.path());
            }
        }
        if candidates.is_empty() {
            return;
        }

        let state = PipelineState {
            waiting: candidates.len(),
            staged: count_entries(&self.ws.symlinks_dir()),
            completed: count_entries(&self.ws.finished_dir()),
            failed: self.count_error_files(),
            input_dir: self.options.input_dir.clone(),
            output_dir: self.options.output_dir.clone(),
        };
        let admitted = self.config.staging.apply(candidates, &state);

        let mut staged = 0usize;
        for file in admitted {
            let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let link = self.ws.symlinks_dir().join(&name);
            match std::os::unix::fs::symlink(&file, &link) {
                Ok(()) => {
                    self.known_stems.insert(name);
                    staged += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "failed to stage file");
                }
            }
        }
        if staged > 0 {
            tracing::info!(count = staged, "Staged new files for processing");
            self.last_activity = Instant::now();
        }
    }

    /// Count fresh `.err` reports per task and log a summary.
    fn report_failed_files(&mut self) {
        for task in self.config.tasks() {
            let Some(seen) = self.task_error_files.get_mut(&task.name) else {
                continue;
            };
            let Ok(entries) = std::fs::read_dir(self.ws.task_dir(&task.name)) else {
                continue;
            };
            let mut fresh = 0usize;
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_file() && name.ends_with(ERR_EXT) && seen.insert(name) {
                    fresh += 1;
                }
            }
            if fresh > 0 {
                tracing::error!(task = %task.name, count = fresh, "failed file(s)");
            }
        }
    }

    /// Retire stems every terminal task has finished.
    fn process_completed_files(&mut self) {
        let mut completed: Option<HashSet<String>> = None;
        for task in self.config.terminal_tasks() {
            let stems = output_stems(&self.ws.task_dir(&task.name), &task.output_ext);
            completed = Some(match completed {
                None => stems,
                Some(prev) => prev.intersection(&stems).cloned().collect(),
            });
        }
        let completed = completed.unwrap_or_default();
        if completed.is_empty() {
            return;
        }

        // Intermediate outputs are promoted or dropped before the stem is
        // marked finished, so a crash here replays harmlessly.
        for task in self.config.tasks() {
            for stem in &completed {
                let file = self.ws.task_dir(&task.name).join(format!("{stem}{}", task.output_ext));
                if task.keep_output {
                    let target = self
                        .ws
                        .public_task_dir(&task.name)
                        .join(format!("{stem}{}", task.output_ext));
                    if let Err(e) = std::fs::rename(&file, &target) {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            tracing::warn!(file = %file.display(), error = %e,
                                "failed to promote output");
                        }
                    }
                } else if let Err(e) = std::fs::remove_file(&file) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(file = %file.display(), error = %e,
                            "failed to remove intermediate output");
                    }
                }
            }
        }

        let root_ext = self.config.root_input_ext().to_string();
        for stem in &completed {
            let name = format!("{stem}{root_ext}");
            let link = self.ws.symlinks_dir().join(&name);
            if let Err(e) = std::fs::remove_file(&link) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(file = %link.display(), error = %e,
                        "failed to remove staged symlink");
                }
            }
            if self.options.delete_input {
                let _ = std::fs::remove_file(self.options.input_dir.join(&name));
            }
            let marker = self.ws.finished_dir().join(&name);
            if let Err(e) = std::fs::write(&marker, "") {
                tracing::warn!(file = %marker.display(), error = %e,
                    "failed to create finished marker");
            }
        }

        tracing::info!(count = completed.len(), "Completed processing files");
        self.last_activity = Instant::now();
    }

    /// Cancel every live task, then wait for the whole fleet to die.
    async fn shutdown_tasks(&mut self) {
        for task in self.config.tasks() {
            let alive = self.task_status.get(&task.name).is_some_and(TaskStatus::is_alive);
            if !alive {
                continue;
            }
            if let Some(handle) = self.handles.get_mut(&task.name) {
                tracing::info!(task = %task.name, "Terminating...");
                handle.cancel(task, self.client.as_ref()).await;
            }
        }
        loop {
            self.check_task_status().await;
            let any_alive = self.task_status.values().any(TaskStatus::is_alive);
            if !any_alive {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    fn count_error_files(&self) -> usize {
        self.config
            .tasks()
            .iter()
            .map(|task| {
                std::fs::read_dir(self.ws.task_dir(&task.name))
                    .map(|entries| {
                        entries
                            .flatten()
                            .filter(|e| {
                                e.file_name().to_string_lossy().ends_with(ERR_EXT)
                                    && e.path().is_file()
                            })
                            .count()
                    })
                    .unwrap_or(0)
            })
            .sum()
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.flatten().count()).unwrap_or(0)
}

fn output_stems(dir: &Path, output_ext: &str) -> HashSet<String> {
    let mut stems = HashSet::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return stems;
    };
    for entry in entries.flatten() {
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stem) = tf_core::strip_ext(&name, output_ext) {
            stems.insert(stem.to_string());
        }
    }
    stems
}

fn spawn_signal_watcher(token: CancellationToken, received: Arc<AtomicI32>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (Ok(mut interrupt), Ok(mut terminate), Ok(mut hangup)) = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::hangup()),
        ) else {
            tracing::warn!("failed to install signal handlers");
            return;
        };

        let signum = tokio::select! {
            _ = interrupt.recv() => SignalKind::interrupt().as_raw_value(),
            _ = terminate.recv() => SignalKind::terminate().as_raw_value(),
            _ = hangup.recv() => SignalKind::hangup().as_raw_value(),
        };
        tracing::warn!(signum, "Received signal, initiating shutdown");
        received.store(signum, Ordering::SeqCst);
        token.cancel();
    });
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
