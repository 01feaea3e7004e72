// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("pipeline is already running (pid {0})")]
    AlreadyRunning(i32),

    #[error(transparent)]
    Config(#[from] tf_config::ConfigError),

    #[error(transparent)]
    Pid(#[from] tf_core::PidFileError),

    #[error("invalid task CLI for '{task}': {reason}")]
    InvalidTaskCli { task: String, reason: String },

    #[error("task CLI validation for '{task}' timed out after {timeout:?}")]
    ProbeTimeout { task: String, timeout: Duration },

    #[error("failed to spawn task '{task}': {source}")]
    Spawn { task: String, source: std::io::Error },

    #[error("failed to submit cluster job for '{task}': {source}")]
    Submit { task: String, source: tf_slurm::SlurmError },

    #[error("failed to {what}: {source}")]
    Io { what: String, source: std::io::Error },
}

impl PipelineError {
    pub(crate) fn io(what: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io { what: what.into(), source }
    }
}
