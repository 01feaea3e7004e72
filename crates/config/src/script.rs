// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch-script rendering.
//!
//! Local tasks run under `bash -c`: setup fragments joined by `;`, then an
//! `exec` of the runner with stdio redirected into the task's log
//! directory. Cluster tasks get a self-contained submission script whose
//! body re-invokes the runner with `--run-directly`; the runtime inside
//! that submission process does the actual work.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::model::{Task, TaskKind};
use crate::params::{params_as_cli_args, shell_quote};

/// Resolved I/O directories for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDirs {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
}

fn base_flags(task: &Task, dirs: &TaskDirs) -> String {
    format!(
        "--task-name {} --input-dir {} --input-ext {} --output-dir {} --output-ext {}",
        task.name,
        dirs.input_dir.display(),
        task.input_ext,
        dirs.output_dir.display(),
        task.output_ext,
    )
}

/// Compose the bash script that launches a local (sequential or
/// cooperative) task.
pub fn local_script(task: &Task, dirs: &TaskDirs, runner: &str) -> String {
    let setup = task.setup_commands.join(";");
    let mut command = format!("exec {runner} {}", base_flags(task, dirs));
    if let TaskKind::LocalAsync { concurrency_limit } = &task.kind {
        let _ = write!(command, " --concurrency-limit {concurrency_limit}");
    }
    for arg in params_as_cli_args(&task.params) {
        let _ = write!(command, " {arg}");
    }

    let stdout_file = dirs.log_dir.join(format!("{}-$$.out", task.name));
    let stderr_file = dirs.log_dir.join(format!("{}-$$.err", task.name));
    format!(
        "#!/bin/bash\n{setup}\n{command} > {} 2> {}\n",
        stdout_file.display(),
        stderr_file.display(),
    )
}

/// Compose the sbatch submission script for a cluster task's client job.
pub fn slurm_client_script(
    task: &Task,
    dirs: &TaskDirs,
    runner: &str,
    client_hours: u64,
) -> String {
    let TaskKind::Slurm { account, max_workers, worker_resources } = &task.kind else {
        // Callers select by kind; a non-cluster task has no client script.
        return String::new();
    };

    let mut command = format!(
        "{runner} {} --account {account} --max-workers {max_workers} \
         --cpus {} --memory {} --time {}",
        base_flags(task, dirs),
        worker_resources.cpus,
        worker_resources.memory,
        worker_resources.time,
    );
    if let Some(gpus) = worker_resources.gpus {
        let _ = write!(command, " --gpus {gpus}");
    }
    command.push_str(" --run-directly");
    for option in &worker_resources.sbatch_options {
        let _ = write!(command, " --sbatch-option {}", shell_quote(option));
    }
    for setup in &task.setup_commands {
        let _ = write!(command, " --setup-command {}", shell_quote(setup));
    }
    for arg in params_as_cli_args(&task.params) {
        let _ = write!(command, " {arg}");
    }

    let mut script = String::new();
    let _ = writeln!(script, "#!/bin/bash");
    let _ = writeln!(script, "#SBATCH --account={account}");
    let _ = writeln!(script, "#SBATCH --job-name={}", task.client_job_name());
    let _ = writeln!(script, "#SBATCH --output={}/%x-%j.out", dirs.log_dir.display());
    let _ = writeln!(script, "#SBATCH --error={}/%x-%j.err", dirs.log_dir.display());
    let _ = writeln!(script, "#SBATCH --nodes=1");
    let _ = writeln!(script, "#SBATCH --ntasks=1");
    let _ = writeln!(script, "#SBATCH --cpus-per-task=1");
    let _ = writeln!(script, "#SBATCH --mem-per-cpu=2G");
    let _ = writeln!(script, "#SBATCH --time={client_hours}:00:00");
    let _ = writeln!(script);
    let _ = writeln!(script, "echo \"Starting cluster client for: {}\"", task.name);
    let _ = writeln!(script, "echo \"With SLURM_JOB_ID: $SLURM_JOB_ID\"");
    let _ = writeln!(script, "echo \"On machine:\" $(hostname)");
    let _ = writeln!(script);
    // One setup command per line in the cluster prologue.
    for setup in &task.setup_commands {
        let _ = writeln!(script, "{setup}");
    }
    let _ = writeln!(script);
    let _ = writeln!(script, "{command}");
    script
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
