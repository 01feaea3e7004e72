// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime variants and their shared plumbing.

pub mod cluster;
pub mod cooperative;
pub mod sequential;
pub mod worker;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::context::SetupContext;
use crate::scan;
use crate::task::{FileTask, TaskError};
use tf_core::fsio::AtomicFile;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("directory does not exist: {0}")]
    MissingDir(PathBuf),

    #[error(transparent)]
    Ext(#[from] tf_core::ExtError),

    #[error("task setup failed: {0}")]
    Setup(TaskError),

    #[error("task teardown failed: {0}")]
    Teardown(TaskError),

    #[error(transparent)]
    Cluster(#[from] tf_slurm::SlurmError),

    #[error("I/O error in {what}: {source}")]
    Io { what: &'static str, source: std::io::Error },
}

/// Directories, extensions and cadence shared by every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub task_name: String,
    pub input_dir: PathBuf,
    pub input_ext: String,
    pub output_dir: PathBuf,
    pub output_ext: String,
    pub poll_interval: Duration,
}

impl RunnerConfig {
    /// Check directories exist and extensions are well-formed.
    pub(crate) fn validate(&self) -> Result<(), RunnerError> {
        for dir in [&self.input_dir, &self.output_dir] {
            if !dir.exists() {
                return Err(RunnerError::MissingDir(dir.clone()));
            }
        }
        tf_core::validate_file_ext(&self.input_ext)?;
        tf_core::validate_file_ext(&self.output_ext)?;
        Ok(())
    }

    pub(crate) fn scan(&self) -> std::io::Result<Vec<PathBuf>> {
        scan::unprocessed_files(
            &self.input_dir,
            &self.input_ext,
            &self.output_dir,
            &self.output_ext,
        )
    }
}

/// Run one file through the task inside an atomic-write window.
///
/// Success commits `<stem><output_ext>`; any failure (user error or write
/// plumbing) is captured as `<stem>.err` instead. Failures never
/// propagate; the runtime continues with the next file.
pub(crate) async fn process_file<T: FileTask>(
    task: &T,
    context: &SetupContext,
    config: &RunnerConfig,
    input: &Path,
) {
    let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let Some(output) = scan::output_path(
        input,
        &config.input_ext,
        &config.output_dir,
        &config.output_ext,
    ) else {
        tracing::warn!(file = %input.display(), "input does not carry the task extension");
        return;
    };

    tracing::info!(file = %name, "Starting processing");
    let result = run_atomic(task, context, input, &output).await;
    match result {
        Ok(()) => {
            tracing::info!(file = %name, "Successfully processed");
        }
        Err(error) => {
            tracing::error!(file = %name, error = %error, "Failed processing");
            write_error_report(&output, &config.output_ext, &error);
        }
    }
}

async fn run_atomic<T: FileTask>(
    task: &T,
    context: &SetupContext,
    input: &Path,
    output: &Path,
) -> Result<(), String> {
    let pending = AtomicFile::begin(output).map_err(|e| e.to_string())?;
    task.run(context, input, pending.path()).await.map_err(|e| report_of(&e))?;
    pending.commit().map_err(|e| e.to_string())
}

/// Render a failure the way it lands in the `.err` report: the message
/// plus any source chain, one frame per line.
fn report_of(error: &TaskError) -> String {
    use std::error::Error as _;
    let mut report = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        report.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    report
}

fn write_error_report(output: &Path, output_ext: &str, report: &str) {
    let Some(error_file) = scan::error_path(output, output_ext) else {
        return;
    };
    let outcome = tf_core::atomic_write(&error_file, |f| f.write_all(report.as_bytes()));
    if let Err(e) = outcome {
        tracing::error!(file = %error_file.display(), error = %e, "failed to write error report");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
