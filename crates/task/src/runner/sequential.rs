// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variant S: strictly sequential scan → process-all → sleep.

use tokio_util::sync::CancellationToken;

use super::{process_file, RunnerConfig, RunnerError};
use crate::context::SetupContext;
use crate::scan;
use crate::task::FileTask;

/// Single-threaded runner processing one file at a time.
pub struct SequentialRunner<T> {
    task: T,
    config: RunnerConfig,
    shutdown: CancellationToken,
}

impl<T: FileTask> SequentialRunner<T> {
    pub fn new(task: T, config: RunnerConfig) -> Self {
        Self { task, config, shutdown: CancellationToken::new() }
    }

    /// Token that stops the poll loop; cancel it from a signal handler.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> Result<(), RunnerError> {
        self.config.validate()?;
        scan::remove_temporary_files(&self.config.output_dir)
            .map_err(|source| RunnerError::Io { what: "temporary cleanup", source })?;

        tracing::info!(task = %self.config.task_name, "Setting up task");
        let mut context = SetupContext::new();
        self.task.setup(&mut context).await.map_err(RunnerError::Setup)?;
        context.freeze();
        tracing::info!(task = %self.config.task_name, "Task setup complete");

        while !self.shutdown.is_cancelled() {
            match self.config.scan() {
                Ok(files) => {
                    for file in files {
                        if self.shutdown.is_cancelled() {
                            break;
                        }
                        process_file(&self.task, &context, &self.config, &file).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "scan failed; will retry next poll");
                }
            }

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!(task = %self.config.task_name, "Shutting down task");
        self.task.teardown(&context).await.map_err(RunnerError::Teardown)?;
        tracing::info!(task = %self.config.task_name, "Task shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "sequential_tests.rs"]
mod tests;
