// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task CLI contract.
//!
//! Every task binary (user modules and built-ins alike) accepts the
//! flags the supervisor renders into launch scripts. The variant is
//! picked from the flags themselves: `--worker-id` runs the cluster
//! worker loop, `--run-directly` runs the cluster client, a
//! `--concurrency-limit` selects the cooperative runner, and the bare
//! flag set runs sequentially. Signals (interrupt, terminate, hangup)
//! cancel cooperatively and map to exit code `128 + signum`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::runner::cluster::{ClusterConfig, ClusterRunner, WorkerResources};
use crate::runner::cooperative::CooperativeRunner;
use crate::runner::sequential::SequentialRunner;
use crate::runner::worker::{run_worker, WorkerConfig};
use crate::runner::{RunnerConfig, RunnerError};
use crate::task::FileTask;
use tf_core::Settings;
use tf_slurm::SlurmClient;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Parse(#[from] clap::Error),

    #[error(transparent)]
    Settings(#[from] tf_core::SettingsError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("missing required flag --{0} for cluster mode")]
    MissingFlag(&'static str),
}

/// Flags shared by every task binary.
#[derive(Debug, Clone, clap::Args)]
pub struct TaskArgs {
    /// Task name, used for job names and logging
    #[arg(long)]
    pub task_name: String,

    /// Input directory to read data
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Input file extension
    #[arg(long)]
    pub input_ext: String,

    /// Output directory to store results
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Output file extension
    #[arg(long)]
    pub output_ext: String,

    /// Maximum concurrent in-flight files (selects the cooperative runner)
    #[arg(long)]
    pub concurrency_limit: Option<usize>,

    /// Cluster account
    #[arg(long)]
    pub account: Option<String>,

    /// Max number of workers for autoscaling
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Number of CPUs per worker
    #[arg(long)]
    pub cpus: Option<u32>,

    /// Memory per worker
    #[arg(long)]
    pub memory: Option<String>,

    /// Wall time per worker
    #[arg(long)]
    pub time: Option<String>,

    /// Number of GPUs per worker
    #[arg(long)]
    pub gpus: Option<u32>,

    /// Extra raw submission option (repeatable)
    #[arg(long = "sbatch-option")]
    pub sbatch_options: Vec<String>,

    /// Worker prologue command (repeatable)
    #[arg(long = "setup-command")]
    pub setup_commands: Vec<String>,

    /// Run the cluster client loop in this process
    #[arg(long)]
    pub run_directly: bool,

    /// Run as a cluster worker with this identifier
    #[arg(long)]
    pub worker_id: Option<String>,

    /// Spool directory holding this worker's claims
    #[arg(long)]
    pub spool_dir: Option<PathBuf>,
}

/// Wrapper for task binaries whose only flags are the shared contract.
#[derive(Debug, Parser)]
struct BareTaskCli {
    #[command(flatten)]
    task: TaskArgs,
}

/// Parse the shared contract from argv and run the task to completion.
pub fn run_blocking<T: FileTask>(task: T, argv: Vec<OsString>) -> Result<i32, CliError> {
    let cli = BareTaskCli::try_parse_from(argv)?;
    execute_blocking(task, cli.task)
}

/// Run on a fresh current-thread runtime (all variants are
/// single-threaded cooperative).
pub fn execute_blocking<T: FileTask>(task: T, args: TaskArgs) -> Result<i32, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| RunnerError::Io { what: "runtime setup", source })?;
    runtime.block_on(execute(task, args))
}

/// Dispatch on the flag-selected variant; returns the process exit code.
pub async fn execute<T: FileTask>(task: T, args: TaskArgs) -> Result<i32, CliError> {
    let settings = Settings::load()?;
    let runner_config = RunnerConfig {
        task_name: args.task_name.clone(),
        input_dir: args.input_dir.clone(),
        input_ext: args.input_ext.clone(),
        output_dir: args.output_dir.clone(),
        output_ext: args.output_ext.clone(),
        poll_interval: settings.task_poll_interval,
    };

    let received = Arc::new(AtomicI32::new(0));

    if let Some(worker_id) = args.worker_id.clone() {
        let spool_dir = args.spool_dir.clone().ok_or(CliError::MissingFlag("spool-dir"))?;
        let token = CancellationToken::new();
        spawn_signal_watcher(token.clone(), Arc::clone(&received));
        run_worker(task, WorkerConfig { runner: runner_config, worker_id, spool_dir }, token)
            .await?;
    } else if args.run_directly {
        let config = ClusterConfig {
            runner: runner_config,
            account: args.account.clone().ok_or(CliError::MissingFlag("account"))?,
            max_workers: args.max_workers.ok_or(CliError::MissingFlag("max-workers"))?,
            resources: WorkerResources {
                cpus: args.cpus.ok_or(CliError::MissingFlag("cpus"))?,
                gpus: args.gpus,
                memory: args.memory.clone().ok_or(CliError::MissingFlag("memory"))?,
                time: args.time.clone().ok_or(CliError::MissingFlag("time"))?,
                sbatch_options: args.sbatch_options.clone(),
            },
            setup_commands: args.setup_commands.clone(),
            worker_command: worker_command_from(std::env::args().collect()),
            scale_interval: settings.slurm_scale_interval,
            scale_wait_count: settings.slurm_scale_wait_count,
            worker_startup_timeout: settings.slurm_worker_startup_timeout,
        };
        let runner = ClusterRunner::new(Arc::new(SlurmClient::default()), config);
        let token = runner.shutdown_token();
        spawn_signal_watcher(token, Arc::clone(&received));
        runner.run().await?;
    } else if let Some(limit) = args.concurrency_limit {
        let runner = CooperativeRunner::new(task, runner_config, limit);
        let token = runner.shutdown_token();
        spawn_signal_watcher(token, Arc::clone(&received));
        runner.run().await?;
    } else {
        let runner = SequentialRunner::new(task, runner_config);
        let token = runner.shutdown_token();
        spawn_signal_watcher(token, Arc::clone(&received));
        runner.run().await?;
    }

    let signum = received.load(Ordering::SeqCst);
    Ok(if signum != 0 { 128 + signum } else { 0 })
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

/// Rebuild the command line a worker job should run: the current argv
/// minus the client-only submission flags (the runtime appends the
/// worker-mode flags itself).
pub(crate) fn worker_command_from(argv: Vec<String>) -> String {
    const VALUE_FLAGS: &[&str] = &[
        "--account",
        "--max-workers",
        "--cpus",
        "--memory",
        "--time",
        "--gpus",
        "--sbatch-option",
        "--setup-command",
    ];

    let mut kept: Vec<String> = Vec::new();
    let mut it = argv.into_iter();
    while let Some(arg) = it.next() {
        if arg == "--run-directly" {
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            let _ = it.next();
            continue;
        }
        if VALUE_FLAGS.iter().any(|flag| arg.starts_with(&format!("{flag}="))) {
            continue;
        }
        kept.push(arg);
    }
    kept.join(" ")
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
