// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variant A: a bounded queue drained by cooperative workers.
//!
//! A scanner refills the queue; `concurrency_limit` workers drain it. A
//! file appears in the queue at most once, tracked by a membership set
//! that the worker clears only after the file reaches a terminal state.
//! Everything runs on one thread; user callbacks are expected to suspend
//! on I/O so their siblings can progress.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{process_file, RunnerConfig, RunnerError};
use crate::context::SetupContext;
use crate::scan;
use crate::task::FileTask;

/// Cooperative-concurrent runner.
pub struct CooperativeRunner<T> {
    task: Arc<T>,
    config: RunnerConfig,
    concurrency_limit: usize,
    shutdown: CancellationToken,
}

impl<T: FileTask> CooperativeRunner<T> {
    pub fn new(task: T, config: RunnerConfig, concurrency_limit: usize) -> Self {
        Self {
            task: Arc::new(task),
            config,
            concurrency_limit: concurrency_limit.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the scanner and cancels the workers.
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
        let context = Arc::new(context);
        tracing::info!(task = %self.config.task_name, "Task setup complete");

        // Queue capacity bounds scanner read-ahead, not concurrency.
        let (tx, rx) = mpsc::channel::<PathBuf>(self.concurrency_limit * 2);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let in_queue: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut tasks = JoinSet::new();

        for _ in 0..self.concurrency_limit {
            let task = Arc::clone(&self.task);
            let context = Arc::clone(&context);
            let config = self.config.clone();
            let rx = Arc::clone(&rx);
            let in_queue = Arc::clone(&in_queue);
            let shutdown = self.shutdown.clone();
            tasks.spawn(async move {
                loop {
                    let file = tokio::select! {
                        () = shutdown.cancelled() => break,
                        file = async { rx.lock().await.recv().await } => match file {
                            Some(file) => file,
                            None => break,
                        },
                    };
                    process_file(task.as_ref(), &context, &config, &file).await;
                    in_queue.lock().remove(&file);
                }
            });
        }

        {
            let config = self.config.clone();
            let in_queue = Arc::clone(&in_queue);
            let shutdown = self.shutdown.clone();
            tasks.spawn(async move {
                while !shutdown.is_cancelled() {
                    match config.scan() {
                        Ok(files) => {
                            for file in files {
                                let fresh = in_queue.lock().insert(file.clone());
                                if !fresh {
                                    continue;
                                }
                                if tx.send(file).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "scan failed; will retry next poll");
                        }
                    }
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(config.poll_interval) => {}
                    }
                }
            });
        }

        // Park until a signal (or an external caller) cancels, then tear
        // everything down. Workers notice the token themselves; aborting
        // covers callbacks that never suspend.
        self.shutdown.cancelled().await;
        tracing::info!(task = %self.config.task_name, "Shutting down task");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        self.task.teardown(&context).await.map_err(RunnerError::Teardown)?;
        tracing::info!(task = %self.config.task_name, "Task shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "cooperative_tests.rs"]
mod tests;
