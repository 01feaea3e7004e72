// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster worker loop, run inside each scheduler worker job.
//!
//! A worker only touches stems claimed for it: the claim files in its own
//! spool directory name the inputs it owns, which is what keeps the
//! at-most-once guarantee across the worker fleet. Setup runs exactly
//! once per worker process; a respawned worker runs it again, which the
//! contract requires to be idempotent.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use super::{process_file, RunnerConfig, RunnerError};
use crate::context::SetupContext;
use crate::scan;
use crate::task::FileTask;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub runner: RunnerConfig,
    pub worker_id: String,
    pub spool_dir: PathBuf,
}

/// Drain the spool until cancelled.
pub async fn run_worker<T: FileTask>(
    task: T,
    config: WorkerConfig,
    shutdown: CancellationToken,
) -> Result<(), RunnerError> {
    config.runner.validate()?;
    if !config.spool_dir.exists() {
        return Err(RunnerError::MissingDir(config.spool_dir.clone()));
    }

    tracing::info!(worker = %config.worker_id, "Setting up task");
    let mut context = SetupContext::new();
    task.setup(&mut context).await.map_err(RunnerError::Setup)?;
    context.freeze();
    tracing::info!(worker = %config.worker_id, "Task setup complete");

    while !shutdown.is_cancelled() {
        match claims(&config.spool_dir) {
            Ok(claimed) => {
                for claim in claimed {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    handle_claim(&task, &context, &config, &claim).await;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "spool scan failed; will retry next poll");
            }
        }

        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(config.runner.poll_interval) => {}
        }
    }

    tracing::info!(worker = %config.worker_id, "Shutting down task");
    task.teardown(&context).await.map_err(RunnerError::Teardown)?;
    tracing::info!(worker = %config.worker_id, "Task shutdown complete");
    Ok(())
}

async fn handle_claim<T: FileTask>(
    task: &T,
    context: &SetupContext,
    config: &WorkerConfig,
    claim: &std::path::Path,
) {
    let input = match input_for_claim(claim, config) {
        Some(input) => input,
        None => {
            tracing::warn!(claim = %claim.display(), "unreadable claim; removing");
            let _ = std::fs::remove_file(claim);
            return;
        }
    };

    let done = scan::already_processed(
        &input,
        &config.runner.input_ext,
        &config.runner.output_dir,
        &config.runner.output_ext,
    );
    if !done {
        process_file(task, context, &config.runner, &input).await;
    }
    let _ = std::fs::remove_file(claim);
}

/// A claim names the input file; its content is the absolute input path.
fn input_for_claim(claim: &std::path::Path, config: &WorkerConfig) -> Option<PathBuf> {
    if let Ok(content) = std::fs::read_to_string(claim) {
        let path = PathBuf::from(content.trim());
        if path.is_file() {
            return Some(path);
        }
    }
    let fallback = config.runner.input_dir.join(claim.file_name()?);
    fallback.is_file().then_some(fallback)
}

fn claims(spool_dir: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(spool_dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
